pub mod batch;
pub mod mass_edit;
