use crate::auth::token::Identity;
use crate::error::AppError;
use crate::models::Task;

/// Allows access to a task only for its owner. Roles grant nothing here: an admin
/// reading someone else's task is refused like anyone else.
pub fn assert_owner(identity: &Identity, task: &Task) -> Result<(), AppError> {
    if task.owner_id == identity.sub {
        Ok(())
    } else {
        log::warn!("User {} denied access to task {}", identity.sub, task.id);
        Err(AppError::Forbidden(
            "You do not have permission to access this task".into(),
        ))
    }
}
