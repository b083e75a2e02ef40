use axum::http::Method;

use crate::{
    auth::AuthUser,
    error::{ApiError, NOT_AUTHENTICATED, NOT_PERMITTED},
};

/// Action
///
/// Classification of a request: safe methods read, everything else writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

impl Action {
    pub fn from_method(method: &Method) -> Self {
        if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
            Action::Read
        } else {
            Action::Write
        }
    }

    pub fn is_safe(self) -> bool {
        self == Action::Read
    }
}

/// allow
///
/// The ownership rule. Reads are unrestricted; a write is allowed only when
/// the requester is the recorded owner. A missing owner denies every write.
pub fn allow(action: Action, requester: Option<i64>, owner: Option<i64>) -> bool {
    match action {
        Action::Read => true,
        Action::Write => matches!((requester, owner), (Some(r), Some(o)) if r == o),
    }
}

/// Permission
///
/// One access check. View-level checks run before the target is loaded,
/// object-level checks after.
pub trait Permission: Send + Sync {
    fn has_permission(&self, _action: Action, _requester: Option<&AuthUser>) -> bool {
        true
    }

    fn has_object_permission(
        &self,
        _action: Action,
        _requester: Option<&AuthUser>,
        _owner: Option<i64>,
    ) -> bool {
        true
    }
}

/// Allows reads to anyone and writes to authenticated requesters.
pub struct IsAuthenticatedOrReadOnly;

impl Permission for IsAuthenticatedOrReadOnly {
    fn has_permission(&self, action: Action, requester: Option<&AuthUser>) -> bool {
        action.is_safe() || requester.is_some()
    }
}

/// Allows writes on an object only to its owner.
pub struct IsOwnerOrReadOnly;

impl Permission for IsOwnerOrReadOnly {
    fn has_object_permission(
        &self,
        action: Action,
        requester: Option<&AuthUser>,
        owner: Option<i64>,
    ) -> bool {
        allow(action, requester.map(|user| user.id), owner)
    }
}

pub fn check_permissions(
    permissions: &[&dyn Permission],
    action: Action,
    requester: Option<&AuthUser>,
) -> Result<(), ApiError> {
    if permissions
        .iter()
        .all(|permission| permission.has_permission(action, requester))
    {
        Ok(())
    } else {
        Err(denied(requester))
    }
}

pub fn check_object_permissions(
    permissions: &[&dyn Permission],
    action: Action,
    requester: Option<&AuthUser>,
    owner: Option<i64>,
) -> Result<(), ApiError> {
    if permissions
        .iter()
        .all(|permission| permission.has_object_permission(action, requester, owner))
    {
        Ok(())
    } else {
        Err(denied(requester))
    }
}

fn denied(requester: Option<&AuthUser>) -> ApiError {
    match requester {
        None => ApiError::PermissionDenied(NOT_AUTHENTICATED),
        Some(_) => ApiError::PermissionDenied(NOT_PERMITTED),
    }
}
