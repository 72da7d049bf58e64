pub mod admin;
pub mod assignment;
pub mod ids;
pub mod logging;
pub mod matching;
pub mod models;
pub mod notify;
pub mod store;
pub mod submission;

// Commonly used data models for matching functions.
pub use models::{
    Address, Gender, ParentRequest, PaymentRange, PreferredGender, RequestStatus, TutorProfile,
    parse_amount,
};
