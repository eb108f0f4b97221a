//! Category sub-workflow entered from the branch step.
//!
//! At step 14 the technician classifies the two batteries of the unit. Each
//! item slot takes a scanned (or typed) code and one category from the
//! closed set `A`..`E`. Selecting the category a slot already holds clears
//! it again. The sub-workflow only closes once both slots are complete.

use crate::error::{QcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Battery category label.
///
/// Shown upper case; stored and sent lower case (`"a"`..`"e"`), which is
/// what the map and report consumers compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    A,
    B,
    C,
    D,
    E,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::A,
        Category::B,
        Category::C,
        Category::D,
        Category::E,
    ];

    /// Returns the string representation of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::A => "A",
            Category::B => "B",
            Category::C => "C",
            Category::D => "D",
            Category::E => "E",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = QcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Category::A),
            "B" => Ok(Category::B),
            "C" => Ok(Category::C),
            "D" => Ok(Category::D),
            "E" => Ok(Category::E),
            _ => Err(QcError::InvalidCategory(s.to_string())),
        }
    }
}

/// One of the two battery slots of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Item1,
    Item2,
}

impl Slot {
    /// Both slots in order.
    pub const BOTH: [Slot; 2] = [Slot::Item1, Slot::Item2];

    /// Returns the string representation of the slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Item1 => "item1",
            Slot::Item2 => "item2",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = QcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "item1" => Ok(Slot::Item1),
            "2" | "item2" => Ok(Slot::Item2),
            _ => Err(QcError::InvalidSlot(s.to_string())),
        }
    }
}

/// In-progress contents of one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDraft {
    /// Scanned or typed code (may still be empty).
    pub code: String,

    /// Selected category, if any.
    pub category: Option<Category>,
}

/// In-progress category submission for the two slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub item1: SlotDraft,
    pub item2: SlotDraft,
}

impl CategoryDraft {
    /// Creates an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the draft for a slot.
    pub fn slot(&self, slot: Slot) -> &SlotDraft {
        match slot {
            Slot::Item1 => &self.item1,
            Slot::Item2 => &self.item2,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotDraft {
        match slot {
            Slot::Item1 => &mut self.item1,
            Slot::Item2 => &mut self.item2,
        }
    }

    /// Stores the code for a slot. Surrounding whitespace is dropped; no
    /// other format checks apply.
    pub fn set_code(&mut self, slot: Slot, code: &str) {
        self.slot_mut(slot).code = code.trim().to_string();
    }

    /// Selects `category` for a slot, or clears the slot when it already
    /// holds that category. Returns the slot's category afterwards.
    pub fn toggle_category(&mut self, slot: Slot, category: Category) -> Option<Category> {
        let draft = self.slot_mut(slot);
        draft.category = if draft.category == Some(category) {
            None
        } else {
            Some(category)
        };
        draft.category
    }

    /// Validates the draft and produces the final assignment.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::MissingCategory`] if either slot lacks a category,
    /// otherwise [`QcError::MissingCode`] if either slot's code is empty.
    pub fn complete(&self) -> Result<CategoryAssignment> {
        for slot in Slot::BOTH {
            if self.slot(slot).category.is_none() {
                return Err(QcError::MissingCategory(slot));
            }
        }
        for slot in Slot::BOTH {
            if self.slot(slot).code.is_empty() {
                return Err(QcError::MissingCode(slot));
            }
        }

        let item = |slot: Slot| -> Result<ItemAssignment> {
            let draft = self.slot(slot);
            Ok(ItemAssignment {
                code: draft.code.clone(),
                category: draft.category.ok_or(QcError::MissingCategory(slot))?,
            })
        };

        Ok(CategoryAssignment {
            item1: item(Slot::Item1)?,
            item2: item(Slot::Item2)?,
        })
    }
}

/// Final code and category of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAssignment {
    pub code: String,
    pub category: Category,
}

/// Completed classification of both items of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub item1: ItemAssignment,
    pub item2: ItemAssignment,
}

impl CategoryAssignment {
    /// Returns the assignment for a slot.
    pub fn item(&self, slot: Slot) -> &ItemAssignment {
        match slot {
            Slot::Item1 => &self.item1,
            Slot::Item2 => &self.item2,
        }
    }

    /// Returns the category assigned to a slot.
    pub fn category(&self, slot: Slot) -> Category {
        self.item(slot).category
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_draft() -> CategoryDraft {
        let mut draft = CategoryDraft::new();
        draft.set_code(Slot::Item1, "B1");
        draft.set_code(Slot::Item2, "B2");
        draft.toggle_category(Slot::Item1, Category::A);
        draft.toggle_category(Slot::Item2, Category::C);
        draft
    }

    #[test]
    fn test_complete_produces_assignment() {
        let assignment = filled_draft().complete().unwrap();
        assert_eq!(assignment.item1.code, "B1");
        assert_eq!(assignment.category(Slot::Item1), Category::A);
        assert_eq!(assignment.item2.code, "B2");
        assert_eq!(assignment.category(Slot::Item2), Category::C);
    }

    #[test]
    fn test_toggle_same_category_clears_slot() {
        let mut draft = CategoryDraft::new();
        assert_eq!(draft.toggle_category(Slot::Item1, Category::B), Some(Category::B));
        assert_eq!(draft.toggle_category(Slot::Item1, Category::B), None);
        assert_eq!(draft.item1.category, None);
    }

    #[test]
    fn test_toggle_different_category_replaces() {
        let mut draft = CategoryDraft::new();
        draft.toggle_category(Slot::Item2, Category::B);
        assert_eq!(draft.toggle_category(Slot::Item2, Category::E), Some(Category::E));
    }

    #[test]
    fn test_missing_category_reported_before_missing_code() {
        let mut draft = CategoryDraft::new();
        draft.toggle_category(Slot::Item1, Category::A);
        assert!(matches!(
            draft.complete(),
            Err(QcError::MissingCategory(Slot::Item2))
        ));
    }

    #[test]
    fn test_missing_code() {
        let mut draft = filled_draft();
        draft.set_code(Slot::Item2, "   ");
        assert!(matches!(draft.complete(), Err(QcError::MissingCode(Slot::Item2))));
    }

    #[test]
    fn test_category_wire_value_is_lowercase() {
        assert_eq!(serde_json::to_value(Category::A).unwrap(), "a");
        assert_eq!(
            serde_json::from_str::<Category>("\"e\"").unwrap(),
            Category::E
        );
        assert_eq!(Category::A.to_string(), "A");
    }

    #[test]
    fn test_parse_category_and_slot() {
        assert_eq!("c".parse::<Category>().unwrap(), Category::C);
        assert!("F".parse::<Category>().is_err());
        assert_eq!("2".parse::<Slot>().unwrap(), Slot::Item2);
        assert_eq!("item1".parse::<Slot>().unwrap(), Slot::Item1);
        assert!("item3".parse::<Slot>().is_err());
    }
}
