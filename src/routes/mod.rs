use actix_web::web::{scope, ServiceConfig};
use actix_web::Scope;

mod academics;
mod activities;
mod activity_types;
mod assignments;
mod auth;
mod events;
mod faculty;
mod friendships;
mod health_check;
mod institutes;
mod messages;
pub mod notifications;
mod students;
mod uploads;

use crate::routes::health_check::*;

fn auth_routes() -> Scope {
    scope("auth")
        .service(auth::register_institute)
        .service(auth::register_student)
        .service(auth::register_faculty)
        .service(auth::login)
        .service(auth::me)
}

fn institute_routes() -> Scope {
    scope("institutes")
        .service(institutes::list_institutes)
        .service(institutes::update_my_institute)
        .service(institutes::get_institute)
}

fn academic_routes() -> Scope {
    scope("academics")
        .service(academics::upsert_structure)
        .service(academics::bulk_upsert_structure)
        .service(academics::academic_tree)
        .service(academics::list_programs)
        .service(academics::update_program)
        .service(academics::set_program_intake)
        .service(academics::delete_program)
        .service(academics::set_student_academics)
        .service(academics::get_student_academics)
}

fn activity_type_routes() -> Scope {
    // `/pending` must win over `/{type_id}`
    scope("activity-types")
        .service(activity_types::create_activity_type)
        .service(activity_types::list_activity_types)
        .service(activity_types::pending_activity_types)
        .service(activity_types::get_activity_type)
        .service(activity_types::update_activity_type)
        .service(activity_types::approve_activity_type)
        .service(activity_types::reject_activity_type)
        .service(activity_types::delete_activity_type)
}

fn activity_routes() -> Scope {
    scope("activities")
        .service(activities::create_activity)
        .service(activities::list_activities)
        .service(activities::activity_stats)
        .service(activities::get_activity)
        .service(activities::update_activity)
        .service(activities::delete_activity)
        .service(activities::approve_activity)
        .service(activities::reject_activity)
}

fn assignment_routes() -> Scope {
    scope("activity-type-assignments")
        .service(assignments::assign)
        .service(assignments::bulk_assign)
        .service(assignments::list_assignments)
        .service(assignments::my_assigned_types)
        .service(assignments::my_pending_activities)
        .service(assignments::unassign)
}

fn activity_assignment_routes() -> Scope {
    scope("activity-assignments")
        .service(assignments::assign_activity)
        .service(assignments::bulk_assign_activities)
        .service(assignments::reassign_activity)
        .service(assignments::list_activity_assignments)
        .service(assignments::faculty_counts)
        .service(assignments::my_assigned_activities)
        .service(assignments::activity_assignment)
        .service(assignments::unassign_activity)
}

fn student_routes() -> Scope {
    scope("students")
        .service(students::create_student)
        .service(students::bulk_create_students)
        .service(students::list_students)
        .service(students::my_profile)
        .service(students::get_student)
        .service(students::update_student)
        .service(students::remove_student)
}

fn faculty_routes() -> Scope {
    scope("faculty")
        .service(faculty::create_faculty)
        .service(faculty::bulk_create_faculty)
        .service(faculty::list_faculty)
        .service(faculty::my_profile)
        .service(faculty::get_faculty)
        .service(faculty::update_faculty)
        .service(faculty::remove_faculty)
}

fn friendship_routes() -> Scope {
    scope("friendships")
        .service(friendships::send_request)
        .service(friendships::list_friends)
        .service(friendships::list_sent)
        .service(friendships::list_received)
        .service(friendships::respond)
        .service(friendships::remove)
}

fn message_routes() -> Scope {
    scope("messages")
        .service(messages::send_message)
        .service(messages::conversation)
        .service(messages::mark_read)
        .service(messages::typing)
        .service(messages::delete_message)
}

fn notification_routes() -> Scope {
    scope("notifications")
        .service(notifications::list_notifications)
        .service(notifications::unread_count)
        .service(notifications::mark_all_read)
        .service(notifications::mark_read)
        .service(notifications::delete_notification)
}

fn upload_routes() -> Scope {
    scope("uploads").service(uploads::sign_upload)
}

fn event_routes() -> Scope {
    scope("events").service(events::event_stream)
}

pub fn hub_routes(conf: &mut ServiceConfig) {
    conf.service(
        scope("api/v1")
            .service(health_check)
            .service(auth_routes())
            .service(institute_routes())
            .service(academic_routes())
            .service(activity_type_routes())
            .service(activity_routes())
            .service(assignment_routes())
            .service(activity_assignment_routes())
            .service(student_routes())
            .service(faculty_routes())
            .service(friendship_routes())
            .service(message_routes())
            .service(notification_routes())
            .service(upload_routes())
            .service(event_routes()),
    );
}
