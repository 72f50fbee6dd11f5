mod decoder;
mod pipeline;
