mod processor;
mod utils;
