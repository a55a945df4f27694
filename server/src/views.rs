//! HTML pages for the to-do list server.
//!
//! Each page function takes the data it displays plus the flash messages
//! already taken from the session, and returns a complete HTML document.
//! All user-supplied text goes through [`escape_html`].

use crate::todos::{list_class, remaining_count, sorted_lists, sorted_todos, total_count};
use crate::types::{Flash, Todo, TodoList};

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2em auto; max-width: 40em; color: #222; }
header { display: flex; justify-content: space-between; align-items: baseline; }
.flash { padding: 0.5em 1em; border-radius: 4px; }
.flash.error { background: #fbe3e4; color: #8a1f11; }
.flash.success { background: #e6efc2; color: #264409; }
ul { list-style: none; padding: 0; }
li { display: flex; gap: 0.5em; align-items: center; padding: 0.25em 0; }
li.complete, li.complete a { color: #999; text-decoration: line-through; }
form.inline { display: inline; }
"#;

/// Confirms deletions and sends them as script-driven requests, which the
/// server answers with `204 No Content` instead of a redirect.
const SCRIPT: &str = r#"
document.addEventListener("submit", function (event) {
  var form = event.target;
  if (!form.classList.contains("delete")) { return; }
  event.preventDefault();
  if (!window.confirm("Are you sure? This cannot be undone!")) { return; }
  fetch(form.action, { method: "POST", headers: { "X-Requested-With": "XMLHttpRequest" } })
    .then(function (response) {
      if (response.status !== 204) { window.location.reload(); return; }
      if (form.dataset.redirect) { window.location.href = form.dataset.redirect; return; }
      var item = form.closest("li");
      if (item) { item.remove(); }
    });
});
"#;

/// Escapes the characters that are significant in HTML text and attributes.
///
/// ```rust
/// use todo_lists_server::views::escape_html;
///
/// assert_eq!(escape_html("<b>\"Tom\" & 'Jerry'</b>"),
///     "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn flash_html(flash: &Flash) -> String {
    let error = flash
        .error
        .iter()
        .map(|error| format!(r#"<div class="flash error"><p>{}</p></div>"#, escape_html(error)));
    let success = flash.success.iter().map(|success| {
        format!(
            r#"<div class="flash success"><p>{}</p></div>"#,
            escape_html(success)
        )
    });

    error.chain(success).collect()
}

fn layout(title: &str, flash: &Flash, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} | Todo Tracker</title>
<style>{STYLE}</style>
</head>
<body>
{flash}
{content}
<script>{SCRIPT}</script>
</body>
</html>
"#,
        title = escape_html(title),
        flash = flash_html(flash),
    )
}

fn list_item(list: &TodoList) -> String {
    format!(
        r#"<li class="{class}"><a href="/lists/{id}">{name}</a> <span>{remaining} / {total}</span></li>"#,
        class = list_class(list).unwrap_or(""),
        id = list.id,
        name = escape_html(&list.name),
        remaining = remaining_count(list),
        total = total_count(list),
    )
}

/// Index of all lists, incomplete lists first.
pub fn lists_page(lists: &[TodoList], flash: &Flash) -> String {
    let items: String = sorted_lists(lists).into_iter().map(list_item).collect();

    let content = format!(
        r#"<header><h2>Lists</h2><a href="/lists/new">New List</a></header>
<ul id="lists">{items}</ul>"#
    );

    layout("Lists", flash, &content)
}

/// Form for creating a list, pre-filled with `list_name`.
pub fn new_list_page(list_name: &str, flash: &Flash) -> String {
    let content = format!(
        r#"<header><h2>Create a new list</h2><a href="/lists">All Lists</a></header>
<form action="/lists" method="post">
<label for="list_name">Enter the name for your new list:</label>
<input id="list_name" name="list_name" placeholder="List Name" type="text" value="{value}">
<input type="submit" value="Save">
</form>"#,
        value = escape_html(list_name),
    );

    layout("New List", flash, &content)
}

fn todo_item(list_id: u64, todo: &Todo) -> String {
    format!(
        r#"<li class="{class}">
<form action="/lists/{list_id}/todos/{id}" method="post" class="inline check">
<input type="hidden" name="completed" value="{next}">
<button type="submit">{label}</button>
</form>
<span>{name}</span>
<form action="/lists/{list_id}/todos/{id}/destroy" method="post" class="inline delete">
<button type="submit">Delete</button>
</form>
</li>"#,
        class = if todo.completed { "complete" } else { "" },
        id = todo.id,
        next = !todo.completed,
        label = if todo.completed { "Undo" } else { "Done" },
        name = escape_html(&todo.name),
    )
}

/// A single list with its todos, pre-filling the new-todo field with `todo_draft`.
pub fn list_page(list: &TodoList, todo_draft: &str, flash: &Flash) -> String {
    let todos: String = sorted_todos(&list.todos)
        .into_iter()
        .map(|todo| todo_item(list.id, todo))
        .collect();

    let content = format!(
        r#"<header>
<h2 class="{class}">{name}</h2>
<span>{remaining} / {total}</span>
<a href="/lists/{id}/edit">Edit List</a>
<a href="/lists">All Lists</a>
</header>
<form action="/lists/{id}/complete_all" method="post">
<button type="submit">Complete All</button>
</form>
<ul id="todos">{todos}</ul>
<form action="/lists/{id}/todos" method="post">
<label for="todo">Enter a new todo item:</label>
<input id="todo" name="todo" placeholder="Something to do" type="text" value="{draft}">
<input type="submit" value="Add">
</form>"#,
        class = list_class(list).unwrap_or(""),
        name = escape_html(&list.name),
        remaining = remaining_count(list),
        total = total_count(list),
        id = list.id,
        draft = escape_html(todo_draft),
    );

    layout(&list.name, flash, &content)
}

/// Rename form for `list`, pre-filled with `list_name`, plus the delete button.
pub fn edit_list_page(list: &TodoList, list_name: &str, flash: &Flash) -> String {
    let content = format!(
        r#"<header><h2>Editing '{name}'</h2><a href="/lists/{id}">Cancel</a></header>
<form action="/lists/{id}" method="post">
<label for="list_name">Enter the new name for the list:</label>
<input id="list_name" name="list_name" type="text" value="{value}">
<input type="submit" value="Save">
</form>
<form action="/lists/{id}/destroy" method="post" class="delete" data-redirect="/lists">
<button type="submit">Delete List</button>
</form>"#,
        name = escape_html(&list.name),
        id = list.id,
        value = escape_html(list_name),
    );

    layout("Edit List", flash, &content)
}
