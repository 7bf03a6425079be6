//! Column sort state.
//!
//! Clicking a column header cycles that column through ascending, descending
//! and unsorted; clicking any other column starts it ascending. List screens
//! start sorted ascending on a default column.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SortState {
    #[default]
    Unsorted,
    Sorted {
        field: String,
        direction: SortDirection,
    },
}

impl SortState {
    pub fn ascending(field: impl Into<String>) -> Self {
        SortState::Sorted {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        SortState::Sorted {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Apply a click on the header of `clicked`.
    pub fn toggle(&mut self, clicked: &str) {
        *self = match std::mem::take(self) {
            SortState::Sorted { field, direction } if field == clicked => match direction {
                SortDirection::Asc => SortState::Sorted {
                    field,
                    direction: SortDirection::Desc,
                },
                SortDirection::Desc => SortState::Unsorted,
            },
            _ => SortState::ascending(clicked),
        };
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            SortState::Sorted { field, .. } => Some(field),
            SortState::Unsorted => None,
        }
    }

    pub fn direction(&self) -> Option<SortDirection> {
        match self {
            SortState::Sorted { direction, .. } => Some(*direction),
            SortState::Unsorted => None,
        }
    }

    /// `ordering=` value given the path the sorted field maps to.
    pub fn ordering_with(&self, path_of: impl FnOnce(&str) -> String) -> Option<String> {
        match self {
            SortState::Sorted { field, direction } => {
                let path = path_of(field);
                Some(match direction {
                    SortDirection::Asc => path,
                    SortDirection::Desc => format!("-{}", path),
                })
            }
            SortState::Unsorted => None,
        }
    }

    /// Inverse of [`SortState::ordering_with`] for plain field paths.
    pub fn from_ordering(ordering: &str) -> Self {
        if ordering.is_empty() {
            return SortState::Unsorted;
        }
        match ordering.strip_prefix('-') {
            Some(field) if !field.is_empty() => SortState::descending(field),
            _ => SortState::ascending(ordering),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cycle_on_same_column() {
        let mut sort = SortState::ascending("fecha");
        sort.toggle("fecha");
        assert_eq!(sort, SortState::descending("fecha"));
        sort.toggle("fecha");
        assert_eq!(sort, SortState::Unsorted);
        sort.toggle("fecha");
        assert_eq!(sort, SortState::ascending("fecha"));
    }

    #[test]
    fn test_other_column_resets_to_ascending() {
        let mut sort = SortState::descending("fecha");
        sort.toggle("monto");
        assert_eq!(sort.field(), Some("monto"));
        assert_eq!(sort.direction(), Some(SortDirection::Asc));
        sort.toggle("monto");
        assert_eq!(sort.direction(), Some(SortDirection::Desc));
    }

    #[test]
    fn test_ordering_param() {
        let path = |f: &str| format!("{}__nombre_fantasia_pila", f);
        assert_eq!(
            SortState::ascending("proveedor").ordering_with(path),
            Some("proveedor__nombre_fantasia_pila".to_string())
        );
        assert_eq!(
            SortState::descending("monto").ordering_with(str::to_string),
            Some("-monto".to_string())
        );
        assert_eq!(SortState::Unsorted.ordering_with(str::to_string), None);
    }

    #[test]
    fn test_from_ordering() {
        assert_eq!(SortState::from_ordering("-monto"), SortState::descending("monto"));
        assert_eq!(SortState::from_ordering("fecha"), SortState::ascending("fecha"));
        assert_eq!(SortState::from_ordering(""), SortState::Unsorted);
        assert_eq!(SortState::from_ordering("-"), SortState::ascending("-"));
    }

    proptest! {
        #[test]
        fn three_clicks_restore_ascending(field in "[a-z_]{1,12}") {
            let mut sort = SortState::ascending(field.clone());
            for _ in 0..3 {
                sort.toggle(&field);
            }
            prop_assert_eq!(sort, SortState::ascending(field));
        }

        #[test]
        fn clicking_another_column_is_always_ascending(
            a in "[a-z]{1,8}",
            b in "[a-z]{1,8}",
            clicks in 0usize..5,
        ) {
            prop_assume!(a != b);
            let mut sort = SortState::ascending(a.clone());
            for _ in 0..clicks {
                sort.toggle(&a);
            }
            sort.toggle(&b);
            prop_assert_eq!(sort, SortState::ascending(b));
        }
    }
}
