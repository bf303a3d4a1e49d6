pub mod corpus;
pub mod metadata;
pub mod template;
