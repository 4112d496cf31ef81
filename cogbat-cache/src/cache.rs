use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
pub use string_cache::DefaultAtom as Atom;

/// Every distinct string drawn during the process. The battery draws a few
/// hundred distinct texts, so entries are never evicted.
#[derive(Default)]
struct Interner {
    atoms: Vec<Atom>,
    ids: HashMap<Atom, usize>,
}

lazy_static! {
    static ref TEXT_INTERNER: RwLock<Interner> = RwLock::new(Interner::default());
}

/// Intern a string and return its id. Ids are stable for the process.
pub fn intern_text(s: &str) -> usize {
    let atom = Atom::from(s);
    if let Some(&idx) = TEXT_INTERNER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .ids
        .get(&atom)
    {
        return idx;
    }
    let mut interner = TEXT_INTERNER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    // Another writer may have pushed it between the two locks.
    if let Some(&idx) = interner.ids.get(&atom) {
        return idx;
    }
    let idx = interner.atoms.len();
    interner.atoms.push(atom.clone());
    interner.ids.insert(atom, idx);
    idx
}

/// Current count of unique texts
pub fn text_count() -> usize {
    TEXT_INTERNER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .atoms
        .len()
}

pub fn get_text(id: usize) -> Option<Atom> {
    TEXT_INTERNER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .atoms
        .get(id)
        .cloned()
}

/// Identifies one rasterized text surface: the same string drawn at a
/// different size or colour is a different entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextKey {
    pub id: usize,
    pub size_bits: u32,
    pub color: [u8; 4],
}

impl TextKey {
    pub fn new(text: &str, size_px: f32, color: [u8; 4]) -> Self {
        Self {
            id: intern_text(text),
            size_bits: size_px.to_bits(),
            color,
        }
    }

    pub fn size_px(&self) -> f32 {
        f32::from_bits(self.size_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let a = intern_text("End of task");
        let b = intern_text("End of task");
        assert_eq!(a, b);
        assert_eq!(get_text(a).as_deref(), Some("End of task"));
        assert!(text_count() > a);
    }

    #[test]
    fn distinct_texts_get_distinct_ids() {
        let ids: Vec<usize> = (0..50).map(|i| intern_text(&format!("digit {i}"))).collect();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(intern_text(&format!("digit {i}")), *id);
            assert_eq!(get_text(*id).as_deref(), Some(format!("digit {i}").as_str()));
        }
        let mut unique = ids.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn keys_differ_by_size_and_colour() {
        let base = TextKey::new("+", 72.0, [0, 0, 0, 255]);
        assert_eq!(base, TextKey::new("+", 72.0, [0, 0, 0, 255]));
        assert_ne!(base, TextKey::new("+", 48.0, [0, 0, 0, 255]));
        assert_ne!(base, TextKey::new("+", 72.0, [255, 0, 0, 255]));
        assert_eq!(base.size_px(), 72.0);
    }
}
