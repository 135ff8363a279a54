//! Version mapping helpers.

/// Map a raw encoded `directorVersion` to the human product version
/// (500, 700, 850, ...). The config checksum branches on the 700 and 800
/// thresholds; the rest of the ladder completes the mapping.
pub fn human_version(raw: i16) -> i32 {
    let ver = raw as i32;
    if ver >= 1951 {
        1200
    } else if ver >= 1922 {
        1150
    } else if ver >= 1921 {
        1100
    } else if ver >= 1851 {
        1000
    } else if ver >= 1700 {
        850
    } else if ver >= 1410 {
        800
    } else if ver >= 1224 {
        700
    } else if ver >= 1218 {
        600
    } else if ver >= 1113 {
        500
    } else if ver >= 1023 {
        404
    } else if ver >= 1000 {
        400
    } else if ver >= 501 {
        310
    } else if ver >= 401 {
        300
    } else {
        200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_thresholds() {
        assert_eq!(human_version(1224), 700);
        assert_eq!(human_version(1409), 700);
        assert_eq!(human_version(1410), 800);
        assert_eq!(human_version(1700), 850);
    }

    #[test]
    fn test_ladder_ends() {
        assert_eq!(human_version(1951), 1200);
        assert_eq!(human_version(0), 200);
    }
}
