pub mod jobs;
pub mod massadmin;
