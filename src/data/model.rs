use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// Time – a row key of the canonical table
// ---------------------------------------------------------------------------

/// A timestamp with a total order so it can key `BTreeMap`s and be sorted.
///
/// `-0.0` is folded into `0.0` on construction; JSON cannot produce NaN.
#[derive(Debug, Clone, Copy)]
pub struct Time(f64);

impl Time {
    pub fn new(t: f64) -> Self {
        Time(canonical_f64(t))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fold negative zero into positive zero so equal inputs stay bit-identical.
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

// ---------------------------------------------------------------------------
// SubjectId – the `id` of a tracked worm
// ---------------------------------------------------------------------------

/// Identity of one tracked subject. Any JSON scalar except `null`.
///
/// Ordering: booleans, then numbers, then strings.
#[derive(Debug, Clone)]
pub enum SubjectId {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SubjectId {
    fn rank(&self) -> u8 {
        match self {
            SubjectId::Bool(_) => 0,
            SubjectId::Number(_) => 1,
            SubjectId::Text(_) => 2,
        }
    }
}

impl From<i64> for SubjectId {
    fn from(v: i64) -> Self {
        SubjectId::Number(v as f64)
    }
}

impl From<&str> for SubjectId {
    fn from(v: &str) -> Self {
        SubjectId::Text(v.to_string())
    }
}

impl PartialEq for SubjectId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SubjectId {}

impl PartialOrd for SubjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SubjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SubjectId::Bool(a), SubjectId::Bool(b)) => a.cmp(b),
            (SubjectId::Number(a), SubjectId::Number(b)) => a.total_cmp(b),
            (SubjectId::Text(a), SubjectId::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl std::hash::Hash for SubjectId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SubjectId::Bool(b) => b.hash(state),
            SubjectId::Number(n) => n.to_bits().hash(state),
            SubjectId::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::Bool(b) => write!(f, "{b}"),
            SubjectId::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            SubjectId::Number(n) => write!(f, "{n}"),
            SubjectId::Text(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute – the closed set of per-sample data keys
// ---------------------------------------------------------------------------

/// Data keys a time-series record may carry besides `id` and `t`.
///
/// Variant order is the lexicographic order of the key names, which is the
/// column order of the canonical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Head,
    Ox,
    Oy,
    Ventral,
    X,
    Y,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Head,
        Attribute::Ox,
        Attribute::Oy,
        Attribute::Ventral,
        Attribute::X,
        Attribute::Y,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "head" => Some(Attribute::Head),
            "ox" => Some(Attribute::Ox),
            "oy" => Some(Attribute::Oy),
            "ventral" => Some(Attribute::Ventral),
            "x" => Some(Attribute::X),
            "y" => Some(Attribute::Y),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Attribute::Head => "head",
            Attribute::Ox => "ox",
            Attribute::Oy => "oy",
            Attribute::Ventral => "ventral",
            Attribute::X => "x",
            Attribute::Y => "y",
        }
    }

    /// Aspected attributes report one value per tracked body point.
    pub fn is_aspected(self) -> bool {
        matches!(self, Attribute::X | Attribute::Y)
    }

    /// Whether cells of this attribute must be numeric.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Attribute::Head | Attribute::Ventral)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// ColumnKey – (id, key, aspect)
// ---------------------------------------------------------------------------

/// Composite column key. Derived `Ord` sorts by id, then key, then aspect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub id: SubjectId,
    pub key: Attribute,
    pub aspect: usize,
}

impl ColumnKey {
    pub fn new(id: SubjectId, key: Attribute, aspect: usize) -> Self {
        ColumnKey { id, key, aspect }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.id, self.key, self.aspect)
    }
}

// ---------------------------------------------------------------------------
// CellValue – a present cell
// ---------------------------------------------------------------------------

/// A present value in the table. Absence is `None` at the store level.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    /// Text labels such as `"L"` for `head` or `"CW"` for `ventral`.
    Label(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Label(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Label(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_keys_sort_by_id_then_key_then_aspect() {
        let mut cols = vec![
            ColumnKey::new(2.into(), Attribute::X, 0),
            ColumnKey::new(1.into(), Attribute::Y, 0),
            ColumnKey::new(1.into(), Attribute::X, 1),
            ColumnKey::new(1.into(), Attribute::Ox, 0),
            ColumnKey::new(1.into(), Attribute::X, 0),
        ];
        cols.sort();
        let shown: Vec<String> = cols.iter().map(|c| c.to_string()).collect();
        assert_eq!(shown, vec!["1/ox/0", "1/x/0", "1/x/1", "1/y/0", "2/x/0"]);
    }

    #[test]
    fn subject_ids_order_bools_numbers_strings() {
        let mut ids = vec![
            SubjectId::from("worm"),
            SubjectId::from(3),
            SubjectId::Bool(true),
            SubjectId::Number(1.5),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                SubjectId::Bool(true),
                SubjectId::Number(1.5),
                SubjectId::from(3),
                SubjectId::from("worm"),
            ]
        );
    }

    #[test]
    fn negative_zero_time_equals_zero() {
        assert_eq!(Time::new(-0.0), Time::new(0.0));
        assert_eq!(Time::new(-0.0).get().to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn attribute_keys_round_trip() {
        for attr in Attribute::ALL {
            assert_eq!(Attribute::from_key(attr.key()), Some(attr));
        }
        assert_eq!(Attribute::from_key("z"), None);
    }
}
