//! Status code names and descriptions.

use crate::sys::*;
use std::ffi::c_int;

/// Returns the symbolic name of an engine status code, if it has one.
pub fn status_name(code: c_int) -> Option<&'static str> {
    let name = match code {
        MDB_SUCCESS => "MDB_SUCCESS",
        MDB_KEYEXIST => "MDB_KEYEXIST",
        MDB_NOTFOUND => "MDB_NOTFOUND",
        MDB_PAGE_NOTFOUND => "MDB_PAGE_NOTFOUND",
        MDB_CORRUPTED => "MDB_CORRUPTED",
        MDB_PANIC => "MDB_PANIC",
        MDB_VERSION_MISMATCH => "MDB_VERSION_MISMATCH",
        MDB_INVALID => "MDB_INVALID",
        MDB_MAP_FULL => "MDB_MAP_FULL",
        MDB_DBS_FULL => "MDB_DBS_FULL",
        MDB_READERS_FULL => "MDB_READERS_FULL",
        MDB_TLS_FULL => "MDB_TLS_FULL",
        MDB_TXN_FULL => "MDB_TXN_FULL",
        MDB_CURSOR_FULL => "MDB_CURSOR_FULL",
        MDB_PAGE_FULL => "MDB_PAGE_FULL",
        MDB_MAP_RESIZED => "MDB_MAP_RESIZED",
        MDB_INCOMPATIBLE => "MDB_INCOMPATIBLE",
        MDB_BAD_RSLOT => "MDB_BAD_RSLOT",
        MDB_BAD_TXN => "MDB_BAD_TXN",
        MDB_BAD_VALSIZE => "MDB_BAD_VALSIZE",
        MDB_BAD_DBI => "MDB_BAD_DBI",
        EACCES => "EACCES",
        EBUSY => "EBUSY",
        EINVAL => "EINVAL",
        _ => return None,
    };
    Some(name)
}

/// Returns a description of an engine status code (`mdb_strerror`).
pub fn strerror(code: c_int) -> &'static str {
    match code {
        MDB_SUCCESS => "Successful return: 0",
        MDB_KEYEXIST => "MDB_KEYEXIST: Key/data pair already exists",
        MDB_NOTFOUND => "MDB_NOTFOUND: No matching key/data pair found",
        MDB_PAGE_NOTFOUND => "MDB_PAGE_NOTFOUND: Requested page not found",
        MDB_CORRUPTED => "MDB_CORRUPTED: Located page was wrong type",
        MDB_PANIC => "MDB_PANIC: Update of meta page failed or environment had fatal error",
        MDB_VERSION_MISMATCH => "MDB_VERSION_MISMATCH: Database environment version mismatch",
        MDB_INVALID => "MDB_INVALID: File is not an LMDB file",
        MDB_MAP_FULL => "MDB_MAP_FULL: Environment mapsize limit reached",
        MDB_DBS_FULL => "MDB_DBS_FULL: Environment maxdbs limit reached",
        MDB_READERS_FULL => "MDB_READERS_FULL: Environment maxreaders limit reached",
        MDB_TLS_FULL => "MDB_TLS_FULL: Thread-local storage keys full - too many environments open",
        MDB_TXN_FULL => "MDB_TXN_FULL: Transaction has too many dirty pages - transaction too big",
        MDB_CURSOR_FULL => "MDB_CURSOR_FULL: Internal error - cursor stack limit reached",
        MDB_PAGE_FULL => "MDB_PAGE_FULL: Internal error - page has no more space",
        MDB_MAP_RESIZED => "MDB_MAP_RESIZED: Database contents grew beyond environment mapsize",
        MDB_INCOMPATIBLE => "MDB_INCOMPATIBLE: Operation and DB incompatible, or DB flags changed",
        MDB_BAD_RSLOT => "MDB_BAD_RSLOT: Invalid reuse of reader locktable slot",
        MDB_BAD_TXN => "MDB_BAD_TXN: Transaction must abort, has a child, or is invalid",
        MDB_BAD_VALSIZE => "MDB_BAD_VALSIZE: Unsupported size of key/DB name/data, or wrong DUPFIXED size",
        MDB_BAD_DBI => "MDB_BAD_DBI: The specified DBI handle was closed/changed unexpectedly",
        EACCES => "Permission denied",
        EBUSY => "Device or resource busy",
        EINVAL => "Invalid argument",
        _ => "Unknown error",
    }
}

/// Returns true if `code` lies in the engine-reserved range.
pub const fn is_engine_code(code: c_int) -> bool {
    MDB_KEYEXIST <= code && code <= MDB_BAD_DBI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_names() {
        assert_eq!(status_name(MDB_NOTFOUND), Some("MDB_NOTFOUND"));
        assert_eq!(status_name(MDB_MAP_FULL), Some("MDB_MAP_FULL"));
        assert_eq!(status_name(EINVAL), Some("EINVAL"));
        assert_eq!(status_name(12345), None);
    }

    #[test]
    fn strerror_matches_lmdb_wording() {
        assert_eq!(
            strerror(MDB_KEYEXIST),
            "MDB_KEYEXIST: Key/data pair already exists"
        );
        assert_eq!(strerror(-1), "Unknown error");
    }

    #[test]
    fn engine_range() {
        assert!(is_engine_code(MDB_KEYEXIST));
        assert!(is_engine_code(MDB_BAD_DBI));
        assert!(!is_engine_code(EINVAL));
        assert!(!is_engine_code(MDB_SUCCESS));
    }
}
