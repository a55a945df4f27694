//! Domain operations over a session's to-do lists.
//!
//! Every function here is pure: it validates and mutates the in-memory
//! collections it is handed and never touches the session store, so the
//! routes decide what to flash, render, or redirect.
//!
//! # Identifiers
//!
//! Lists and todos are addressed by a stable id, assigned as the highest
//! existing id plus one (`1` for an empty collection). Deleting an element
//! never shifts the ids of the others.
//!
//! # Example
//!
//! ```rust
//! use todo_lists_server::todos;
//!
//! let mut lists = Vec::new();
//! let id = todos::create_list(&mut lists, "Groceries").unwrap().id;
//!
//! let list = todos::find_list_mut(&mut lists, id).unwrap();
//! todos::add_todo(list, "Milk").unwrap();
//! todos::add_todo(list, "Eggs").unwrap();
//! todos::complete_all(list);
//!
//! assert!(todos::is_list_complete(list));
//! assert_eq!(todos::remaining_count(list), 0);
//! assert_eq!(todos::total_count(list), 2);
//! ```

use crate::error::{
    Result, TodoError, LIST_NAME_LENGTH_MESSAGE, LIST_NAME_UNIQUE_MESSAGE,
    TODO_NAME_LENGTH_MESSAGE,
};
use crate::types::{Todo, TodoList};

/// Longest accepted list or todo name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

// ============================================================================
// Validation and id assignment
// ============================================================================

fn has_valid_length(name: &str) -> bool {
    (1..=MAX_NAME_LENGTH).contains(&name.chars().count())
}

/// Checks a trimmed list name against the length range and the other lists.
///
/// `renaming` names the list whose own name is ignored by the uniqueness
/// check.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] if the name is empty, longer than
/// [`MAX_NAME_LENGTH`], or used by another list.
pub fn validate_list_name(lists: &[TodoList], name: &str, renaming: Option<u64>) -> Result<()> {
    if !has_valid_length(name) {
        return Err(TodoError::validation(LIST_NAME_LENGTH_MESSAGE));
    }

    let taken = lists
        .iter()
        .any(|list| Some(list.id) != renaming && list.name == name);
    if taken {
        return Err(TodoError::validation(LIST_NAME_UNIQUE_MESSAGE));
    }

    Ok(())
}

/// Checks a trimmed todo name against the length range.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] if the name is empty or longer than
/// [`MAX_NAME_LENGTH`].
pub fn validate_todo_name(name: &str) -> Result<()> {
    if has_valid_length(name) {
        Ok(())
    } else {
        Err(TodoError::validation(TODO_NAME_LENGTH_MESSAGE))
    }
}

/// Returns the id for the next element of a collection.
///
/// ```rust
/// use todo_lists_server::todos::next_id;
///
/// assert_eq!(next_id([]), 1);
/// assert_eq!(next_id([1, 3]), 4);
/// ```
pub fn next_id(ids: impl IntoIterator<Item = u64>) -> u64 {
    ids.into_iter().max().unwrap_or(0) + 1
}

// ============================================================================
// Lists
// ============================================================================

/// Looks up a list by id.
///
/// # Errors
///
/// Returns [`TodoError::NotFound`] if no list has the id.
pub fn find_list(lists: &[TodoList], id: u64) -> Result<&TodoList> {
    lists
        .iter()
        .find(|list| list.id == id)
        .ok_or_else(TodoError::list_not_found)
}

/// Looks up a list by id for mutation.
///
/// # Errors
///
/// Returns [`TodoError::NotFound`] if no list has the id.
pub fn find_list_mut(lists: &mut [TodoList], id: u64) -> Result<&mut TodoList> {
    lists
        .iter_mut()
        .find(|list| list.id == id)
        .ok_or_else(TodoError::list_not_found)
}

/// Appends a new, empty list named `name` (trimmed).
///
/// # Errors
///
/// Returns [`TodoError::Validation`] if the trimmed name fails
/// [`validate_list_name`]; `lists` is left untouched.
pub fn create_list<'a>(lists: &'a mut Vec<TodoList>, name: &str) -> Result<&'a TodoList> {
    let name = name.trim();
    validate_list_name(lists, name, None)?;

    let id = next_id(lists.iter().map(|list| list.id));
    let index = lists.len();
    lists.push(TodoList {
        id,
        name: name.to_string(),
        todos: Vec::new(),
    });

    Ok(&lists[index])
}

/// Renames the list with `id` to `name` (trimmed).
///
/// # Errors
///
/// Returns [`TodoError::NotFound`] if the list does not exist, or
/// [`TodoError::Validation`] if the trimmed name is rejected.
pub fn rename_list(lists: &mut [TodoList], id: u64, name: &str) -> Result<()> {
    find_list(lists, id)?;

    let name = name.trim();
    validate_list_name(lists, name, Some(id))?;

    find_list_mut(lists, id)?.name = name.to_string();
    Ok(())
}

/// Removes the list with `id`, returning it if it existed.
pub fn delete_list(lists: &mut Vec<TodoList>, id: u64) -> Option<TodoList> {
    let index = lists.iter().position(|list| list.id == id)?;
    Some(lists.remove(index))
}

// ============================================================================
// Todos
// ============================================================================

/// Appends an incomplete todo named `name` (trimmed) to `list`.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] if the trimmed name fails
/// [`validate_todo_name`]; the list is left untouched.
pub fn add_todo<'a>(list: &'a mut TodoList, name: &str) -> Result<&'a Todo> {
    let name = name.trim();
    validate_todo_name(name)?;

    let id = next_id(list.todos.iter().map(|todo| todo.id));
    let index = list.todos.len();
    list.todos.push(Todo {
        id,
        name: name.to_string(),
        completed: false,
    });

    Ok(&list.todos[index])
}

/// Removes the todo with `todo_id`, returning it if it existed.
pub fn delete_todo(list: &mut TodoList, todo_id: u64) -> Option<Todo> {
    let index = list.todos.iter().position(|todo| todo.id == todo_id)?;
    Some(list.todos.remove(index))
}

/// Sets the completion flag of the todo with `todo_id`.
///
/// # Errors
///
/// Returns [`TodoError::NotFound`] if the list has no such todo.
pub fn set_todo_completion(list: &mut TodoList, todo_id: u64, completed: bool) -> Result<()> {
    let todo = list
        .todos
        .iter_mut()
        .find(|todo| todo.id == todo_id)
        .ok_or_else(TodoError::todo_not_found)?;

    todo.completed = completed;
    Ok(())
}

/// Marks every todo in `list` as completed.
pub fn complete_all(list: &mut TodoList) {
    for todo in &mut list.todos {
        todo.completed = true;
    }
}

// ============================================================================
// Presentation helpers
// ============================================================================

/// A list is complete when it has at least one todo and none remain.
pub fn is_list_complete(list: &TodoList) -> bool {
    total_count(list) > 0 && remaining_count(list) == 0
}

/// Number of incomplete todos.
pub fn remaining_count(list: &TodoList) -> usize {
    list.todos.iter().filter(|todo| !todo.completed).count()
}

/// Number of todos.
pub fn total_count(list: &TodoList) -> usize {
    list.todos.len()
}

/// CSS class for a list entry.
pub fn list_class(list: &TodoList) -> Option<&'static str> {
    is_list_complete(list).then_some("complete")
}

/// Stable two-way partition: elements failing `is_done` first, the rest after.
fn partition_incomplete_first<T>(items: &[T], is_done: impl Fn(&T) -> bool) -> Vec<&T> {
    let (done, pending): (Vec<&T>, Vec<&T>) = items.iter().partition(|item| is_done(*item));
    pending.into_iter().chain(done).collect()
}

/// Incomplete lists first, complete lists last, each group in original order.
pub fn sorted_lists(lists: &[TodoList]) -> Vec<&TodoList> {
    partition_incomplete_first(lists, is_list_complete)
}

/// Incomplete todos first, completed todos last, each group in original order.
pub fn sorted_todos(todos: &[Todo]) -> Vec<&Todo> {
    partition_incomplete_first(todos, |todo| todo.completed)
}
