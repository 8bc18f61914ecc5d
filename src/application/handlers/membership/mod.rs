//! Membership handlers.

mod delete_membership;

pub use delete_membership::{
    DeleteMembershipCommand, DeleteMembershipHandler, DeleteMembershipResult,
};
