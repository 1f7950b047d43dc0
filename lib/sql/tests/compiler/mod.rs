mod execution;
mod statements;
mod test_utils;
