// User accounts: the data-access functions shared by auth, profile and admin.

pub mod queries;
