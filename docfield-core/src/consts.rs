/// Minimum overlap a token must share with a field region, on each axis.
///
/// The matcher measures the overlap of a token's bounding box with a field
/// region relative to the token's own height (`h1 / h`) and width (`w1 / w`).
/// Both ratios must be strictly greater than this value for the token to be
/// accepted. The axes are tested independently, so a token that is tall
/// enough but shifted sideways out of the region is still rejected.
///
/// - Lower values (0.4-0.5): tolerate looser anchor offsets, more false matches
/// - Higher values (0.7-0.8): stricter, fields fall through to retry more often
pub const OVERLAP_THRESHOLD: f32 = 0.6;

/// Rotations tried by the classifier, in scan order (degrees, clockwise).
///
/// The first rotation whose tokens satisfy a template's anchor ordering wins,
/// so the upright orientation is listed first.
pub const ROTATION_SCAN_ORDER: [u16; 4] = [0, 90, 180, 270];

/// Brightness factors used by the default retry cascade, after identity and
/// grayscale.
pub const RETRY_BRIGHTNESS: [f32; 2] = [0.8, 0.6];

/// Vertical tolerance for grouping tokens on one line when sorting into
/// reading order, as a fraction of the smaller token height.
pub const LINE_TOLERANCE: f32 = 0.5;

/// Status label written to the output record when no template matches.
pub const UNRECOGNIZED_STATUS: &str = "unrecognized";

/// Environment variable naming a directory of JSON templates to load on top
/// of the built-in set.
pub const TEMPLATE_DIR_ENV_NAME: &str = "DOCFIELD_TEMPLATE_DIR";

/// Weights of the first 17 digits of an 18-digit resident identity number
/// (ISO 7064 MOD 11-2).
pub const ID_CHECKSUM_WEIGHTS: [u32; 17] = [7, 9, 10, 5, 8, 4, 2, 1, 6, 3, 7, 9, 10, 5, 8, 4, 2];

/// Check characters indexed by the weighted digit sum modulo 11.
pub const ID_CHECKSUM_CHARS: [char; 11] = ['1', '0', 'X', '9', '8', '7', '6', '5', '4', '3', '2'];
