// ========================================================================= //

macro_rules! msi_error {
    ($variant:ident, $e:expr) => {
        return Err($crate::internal::error::Error::$variant(
            ::std::string::ToString::to_string(&$e),
        ))
    };
    ($variant:ident, $fmt:expr, $($arg:tt)+) => {
        return Err($crate::internal::error::Error::$variant(
            format!($fmt, $($arg)+),
        ))
    };
}

macro_rules! access_denied {
    ($($arg:tt)+) => { msi_error!(AccessDenied, $($arg)+) };
}

macro_rules! bad_query_syntax {
    ($($arg:tt)+) => { msi_error!(BadQuerySyntax, $($arg)+) };
}

macro_rules! datatype_mismatch {
    ($($arg:tt)+) => { msi_error!(DatatypeMismatch, $($arg)+) };
}

macro_rules! function_failed {
    ($($arg:tt)+) => { msi_error!(FunctionFailed, $($arg)+) };
}

macro_rules! invalid_handle {
    ($($arg:tt)+) => { msi_error!(InvalidHandle, $($arg)+) };
}

macro_rules! invalid_parameter {
    ($($arg:tt)+) => { msi_error!(InvalidParameter, $($arg)+) };
}

macro_rules! invalid_table {
    ($($arg:tt)+) => { msi_error!(InvalidTable, $($arg)+) };
}

macro_rules! more_data {
    ($($arg:tt)+) => { msi_error!(MoreData, $($arg)+) };
}

macro_rules! no_more_items {
    ($($arg:tt)+) => { msi_error!(NoMoreItems, $($arg)+) };
}

macro_rules! not_enough_memory {
    ($($arg:tt)+) => { msi_error!(NotEnoughMemory, $($arg)+) };
}

macro_rules! not_found {
    ($($arg:tt)+) => { msi_error!(NotFound, $($arg)+) };
}

macro_rules! open_failed {
    ($($arg:tt)+) => { msi_error!(OpenFailed, $($arg)+) };
}

// ========================================================================= //
