use anyhow::Result;
use hyperion_core::groups::AccountType;
use hyperion_core::users::{self, Membership, UserCreate};
use hyperion_core::{Database, Settings};
use owo_colors::OwoColorize;

pub fn run(
    settings: Settings,
    email: String,
    name: String,
    firstname: String,
    account_type: AccountType,
    groups: Vec<String>,
) -> Result<()> {
    let db = Database::open(&settings.database_path)?;

    let (user, token) = db.transaction(|tx| {
        let user = users::create_user(
            tx,
            &UserCreate {
                email,
                name,
                firstname,
                account_type,
            },
        )?;
        for group_id in groups {
            users::add_membership(
                tx,
                &Membership {
                    user_id: user.id,
                    group_id,
                },
            )?;
        }
        let token = users::create_access_token(tx, user.id)?;
        Ok((user, token))
    })?;

    println!("{} {} ({})", "Created".green(), user.email.bold(), user.id);
    println!("  Account type: {}", user.account_type);
    println!("  Access token: {}", token.yellow());

    Ok(())
}
