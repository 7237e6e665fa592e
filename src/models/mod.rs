mod category;
mod entry;
mod profile;

pub(crate) use category::{CategoryList, CategoryListDocument};
pub(crate) use entry::{Entry, EntryDocument, EntryDraft, EntryType, ValidationError};
pub(crate) use profile::{Profile, PROFILE_DOCUMENT_ID};

/// Document keys inside a user collection that never hold entries.
pub(crate) const RESERVED_DOCUMENT_IDS: &[&str] = &[
    "IncomeCategoryList",
    "ExpenseCategoryList",
    PROFILE_DOCUMENT_ID,
];
