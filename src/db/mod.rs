pub mod academics;
pub mod activities;
pub mod activity_types;
pub mod assignments;
pub mod faculty;
pub mod friendships;
pub mod institutes;
pub mod messages;
pub mod notifications;
pub mod students;
pub mod users;
