pub mod create_group;
pub mod create_user;
pub mod recreate_ics;
pub mod serve;
