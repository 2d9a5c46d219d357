mod errors;
mod pipeline;
mod relations;
mod table_query;
