//! Content store entities

pub mod asset;
pub mod json;
pub mod lesson;
pub mod program;
pub mod program_topic;
pub mod term;
pub mod topic;
pub mod user;

pub use asset::Entity as Asset;
pub use lesson::Entity as Lesson;
pub use program::Entity as Program;
pub use program_topic::Entity as ProgramTopic;
pub use term::Entity as Term;
pub use topic::Entity as Topic;
pub use user::Entity as User;

pub use json::{LanguageList, UrlMap};

pub mod prelude {
    pub use super::asset::Entity as Asset;
    pub use super::lesson::Entity as Lesson;
    pub use super::program::Entity as Program;
    pub use super::program_topic::Entity as ProgramTopic;
    pub use super::term::Entity as Term;
    pub use super::topic::Entity as Topic;
    pub use super::user::Entity as User;
}
