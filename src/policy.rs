// src/policy.rs

//! Ownership and role checks. Pure functions of the actor and the resource.

use crate::{
    error::AppError,
    models::{comment::Comment, post::Post, user::User},
};

/// The guarded operations; each carries its own denial message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdatePost,
    DeletePost,
    UpdateComment,
    DeleteComment,
    SetAdminStatus,
}

impl Action {
    pub fn denial_message(self) -> &'static str {
        match self {
            Action::UpdatePost => "Unauthorized. You can only update your own posts.",
            Action::DeletePost => "Unauthorized. You can only delete your own posts.",
            Action::UpdateComment => "Unauthorized. You can only update your own comments.",
            Action::DeleteComment => {
                "Unauthorized. You can only delete your own comments or comments on your posts."
            }
            Action::SetAdminStatus => "Unauthorized. Only admins can perform this action.",
        }
    }
}

pub fn can_modify_post(actor: &User, post: &Post) -> bool {
    actor.id == post.user_id || actor.is_admin
}

pub fn can_delete_post(actor: &User, post: &Post) -> bool {
    actor.id == post.user_id || actor.is_admin
}

pub fn can_modify_comment(actor: &User, comment: &Comment) -> bool {
    actor.id == comment.user_id || actor.is_admin
}

/// Post owners may also moderate the comments on their own posts.
pub fn can_delete_comment(actor: &User, comment: &Comment, post: &Post) -> bool {
    actor.id == comment.user_id || actor.id == post.user_id || actor.is_admin
}

pub fn can_set_admin_status(actor: &User) -> bool {
    actor.is_admin
}

/// Turns a predicate outcome into `Forbidden` with the action's message.
pub fn authorize(allowed: bool, action: Action) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(action.denial_message().to_string()))
    }
}
