//! Static permission groups and account types.
//!
//! A user may belong to several groups. Belonging to a group grants access to a
//! set of endpoints; most groups correspond to the administration of one module.
//! Being a member of `admin` only grants rights over admin specific endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::db::text_enum_sql;
use crate::error::Error;

/// Groups the application relies on. Their ids are fixed so that they survive
/// database rebuilds and can be referenced from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupType {
    Admin,
    Bde,
    AdminCalendar,
    AdminFeed,
}

impl GroupType {
    pub const ALL: [GroupType; 4] = [
        GroupType::Admin,
        GroupType::Bde,
        GroupType::AdminCalendar,
        GroupType::AdminFeed,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            GroupType::Admin => "0a25cb76-4b63-4fd3-b939-da6d9feabf28",
            GroupType::Bde => "53a669d6-84b1-4352-8d7c-421c1fbd9c6a",
            GroupType::AdminCalendar => "b0357687-2211-410a-9e2a-144519eeaafa",
            GroupType::AdminFeed => "59e3c4c2-e60f-44b6-b0d2-fa1b248423bb",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GroupType::Admin => "admin",
            GroupType::Bde => "BDE",
            GroupType::AdminCalendar => "admin_calendar",
            GroupType::AdminFeed => "admin_feed",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}<{}>", self.name(), self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Student,
    FormerStudent,
    Staff,
    Association,
    External,
    OtherSchoolStudent,
    Demo,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Student => "student",
            AccountType::FormerStudent => "former_student",
            AccountType::Staff => "staff",
            AccountType::Association => "association",
            AccountType::External => "external",
            AccountType::OtherSchoolStudent => "other_school_student",
            AccountType::Demo => "demo",
        }
    }

    /// Whether this account type belongs to the school (as opposed to externals
    /// and students from partner schools).
    pub fn is_school_member(&self) -> bool {
        school_account_types().contains(self)
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(AccountType::Student),
            "former_student" => Ok(AccountType::FormerStudent),
            "staff" => Ok(AccountType::Staff),
            "association" => Ok(AccountType::Association),
            "external" => Ok(AccountType::External),
            "other_school_student" => Ok(AccountType::OtherSchoolStudent),
            "demo" => Ok(AccountType::Demo),
            other => Err(Error::Validation(format!("Unknown account type: {other}"))),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_enum_sql!(AccountType);

pub fn school_account_types() -> &'static [AccountType] {
    &[
        AccountType::Student,
        AccountType::FormerStudent,
        AccountType::Staff,
        AccountType::Association,
        AccountType::Demo,
    ]
}
