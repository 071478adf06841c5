//! HTML bodies for notification emails. Plain-text parts are derived by
//! stripping markup.

use std::sync::LazyLock;

use crate::shared::utils::html_escape;
use crate::tasks::aggregation::TopTask;
use crate::tasks::types::{Comment, Task};
use crate::users::types::User;

static TAG_REGEX: LazyLock<Option<regex::Regex>> =
    LazyLock::new(|| regex::Regex::new(r"(?s)<[^>]*>").ok());

static BLANK_LINES_REGEX: LazyLock<Option<regex::Regex>> =
    LazyLock::new(|| regex::Regex::new(r"\n\s*\n+").ok());

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #222;">
<h2>{title}</h2>
{body}
<p style="color: #888; font-size: 12px;">This is an automated message from the task management service.</p>
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn greeting(user: &User) -> String {
    let name = user.full_name();
    let name = if name.is_empty() { &user.username } else { &name };
    format!("<p>Hello {},</p>", html_escape(name))
}

pub fn task_assigned(task: &Task, assignee: &User) -> String {
    let body = format!(
        "{}\n<p>You have been assigned the task <strong>{}</strong>.</p>\n<p>{}</p>\n<p>Status: {}</p>",
        greeting(assignee),
        html_escape(&task.title),
        html_escape(&task.description),
        task.status,
    );
    layout("New task assignment", &body)
}

pub fn task_completed(task: &Task) -> String {
    let body = format!(
        "<p>The task <strong>{}</strong> has been marked as completed.</p>\n<p>{}</p>",
        html_escape(&task.title),
        html_escape(&task.description),
    );
    layout("Task completed", &body)
}

pub fn task_commented(
    task: &Task,
    assignee: &User,
    author: Option<&User>,
    comment: &Comment,
) -> String {
    let author_name = author
        .map(|a| a.username.clone())
        .unwrap_or_else(|| "Someone".to_string());
    let body = format!(
        "{}\n<p>{} commented on your task <strong>{}</strong>:</p>\n<blockquote>{}</blockquote>",
        greeting(assignee),
        html_escape(&author_name),
        html_escape(&task.title),
        html_escape(&comment.text),
    );
    layout("New comment", &body)
}

pub fn top_tasks_report(tasks: &[TopTask]) -> String {
    let rows: String = tasks
        .iter()
        .map(|task| {
            format!(
                "<tr><td>{}</td><td style=\"text-align: right;\">{}</td></tr>\n",
                html_escape(&task.title),
                task.total_minutes
            )
        })
        .collect();
    let body = format!(
        "<table>\n<tr><th>Task</th><th>Minutes</th></tr>\n{rows}</table>"
    );
    layout("Top tasks by logged time", &body)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

pub fn strip_tags(html: &str) -> String {
    let Some(tags) = TAG_REGEX.as_ref() else {
        return html.to_string();
    };
    let text = tags.replace_all(html, "");
    let text = match BLANK_LINES_REGEX.as_ref() {
        Some(blank) => blank.replace_all(&text, "\n\n").into_owned(),
        None => text.into_owned(),
    };
    decode_entities(text.trim())
}
