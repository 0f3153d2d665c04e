//! The mass edit protocol: selection encoding, the capture form, dispatch, and
//! the background apply.

pub mod dispatcher;
pub mod encoder;
pub mod form;
pub mod records;
pub mod registry;
pub mod request;
pub mod sanitize;
pub mod session;
pub mod view;
pub mod worker;
