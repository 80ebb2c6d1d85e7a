pub(crate) mod compare;
pub(crate) mod events;
pub(crate) mod history;
pub(crate) mod list;
