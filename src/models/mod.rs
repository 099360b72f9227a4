pub mod contact;
pub mod posting;
