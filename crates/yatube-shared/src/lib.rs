//! # Yatube Shared
//!
//! Form schemas shared by the handlers and the templates: payload types,
//! validation rules and the labels, help texts and placeholders shown
//! next to each field.

pub mod dto;
pub mod forms;

pub use forms::{CommentForm, FieldMeta, FormErrors, PostForm};
