pub mod authz;
pub mod skills;
