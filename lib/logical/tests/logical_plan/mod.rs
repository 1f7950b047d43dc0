mod rewriter;
mod test_utils;
