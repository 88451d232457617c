pub mod task;
pub mod user;

pub use task::{
    CreateTaskInput, LabelInput, NewTask, Task, TaskChanges, TaskLabel, TaskStatus,
    UpdateTaskInput,
};
pub use user::{NewUser, PublicUser, Role, User};
