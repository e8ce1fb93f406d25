//! Diesel schema for workflow persistence.

diesel::table! {
    /// Task rows with the workflow-owned columns.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Task title.
        #[max_length = 200]
        title -> Varchar,
        /// Optional task description.
        description -> Nullable<Text>,
        /// Optional assignee.
        assignee_id -> Nullable<Uuid>,
        /// Creator.
        created_by -> Uuid,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Completion timestamp, set only while status is `done`.
        completed_at -> Nullable<Timestamptz>,
        /// Optimistic concurrency version, bumped by every commit.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last mutation timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Stakeholder enrolment rows, one per (task, member) pair.
    task_stakeholders (task_id, member_id) {
        /// Task the stakeholder belongs to.
        task_id -> Uuid,
        /// Enrolled member.
        member_id -> Uuid,
        /// Informational role.
        #[max_length = 50]
        role -> Varchar,
        /// Enrolment timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only status-change ledger rows.
    task_status_history (id) {
        /// Record identifier.
        id -> Uuid,
        /// Task the record belongs to.
        task_id -> Uuid,
        /// Origin status, null only for the creation record.
        #[max_length = 20]
        from_status -> Nullable<Varchar>,
        /// Target status.
        #[max_length = 20]
        to_status -> Varchar,
        /// Requesting member.
        changed_by -> Uuid,
        /// Free-text comment.
        comment -> Nullable<Text>,
        /// Review gate crossed by the transition.
        #[max_length = 50]
        review_type -> Nullable<Varchar>,
        /// Review result; `pending` marks an open ballot.
        #[max_length = 20]
        review_result -> Nullable<Varchar>,
        /// Review feedback.
        review_feedback -> Nullable<Text>,
        /// Record timestamp.
        changed_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-stakeholder approval votes, one per (ballot, member) pair.
    task_status_approvals (status_change_id, stakeholder_id) {
        /// Ledger record the vote belongs to.
        status_change_id -> Uuid,
        /// Voting stakeholder.
        stakeholder_id -> Uuid,
        /// Vote state.
        #[max_length = 20]
        approval_status -> Varchar,
        /// Vote comment.
        comment -> Nullable<Text>,
        /// Enrolment timestamp.
        created_at -> Timestamptz,
        /// Resolution timestamp.
        approved_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(task_stakeholders -> tasks (task_id));
diesel::joinable!(task_status_history -> tasks (task_id));
diesel::joinable!(task_status_approvals -> task_status_history (status_change_id));

diesel::allow_tables_to_appear_in_same_query!(
    tasks,
    task_stakeholders,
    task_status_history,
    task_status_approvals,
);
