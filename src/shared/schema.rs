diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        email -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        password_hash -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tasks (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Text,
        assignee_id -> Uuid,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    comments (id) {
        id -> Uuid,
        text -> Text,
        task_id -> Uuid,
        author_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    time_logs (id) {
        id -> Uuid,
        user_id -> Uuid,
        task_id -> Uuid,
        start_time -> Nullable<Timestamptz>,
        end_time -> Nullable<Timestamptz>,
        date -> Nullable<Date>,
        duration_minutes -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    attachments (id) {
        id -> Uuid,
        task_id -> Uuid,
        filename -> Nullable<Varchar>,
        status -> Varchar,
        bucket -> Nullable<Varchar>,
        content_type -> Nullable<Varchar>,
        object_name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(tasks -> users (assignee_id));
diesel::joinable!(comments -> tasks (task_id));
diesel::joinable!(time_logs -> tasks (task_id));
diesel::joinable!(attachments -> tasks (task_id));

diesel::allow_tables_to_appear_in_same_query!(users, tasks, comments, time_logs, attachments);
