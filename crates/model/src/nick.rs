use super::ids::NickHandle;
use super::types::NickFields;

/// One nicklist entry of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nick {
    pub handle: NickHandle,
    pub visible: bool,
    pub group: bool,
    /// Zero for top-level entries; deeper levels belong to nicklist groups.
    pub level: u32,
    pub name: String,
    pub color: String,
    pub prefix: String,
    pub prefix_color: String,
}

impl Nick {
    pub fn new(handle: NickHandle) -> Self {
        Self {
            handle,
            visible: false,
            group: false,
            level: 0,
            name: String::new(),
            color: String::new(),
            prefix: String::new(),
            prefix_color: String::new(),
        }
    }

    /// Overwrites the fields present in `fields`. Returns whether anything changed.
    pub fn apply_fields(&mut self, fields: NickFields) -> bool {
        let before = self.clone();
        if let Some(visible) = fields.visible {
            self.visible = visible;
        }
        if let Some(group) = fields.group {
            self.group = group;
        }
        if let Some(level) = fields.level {
            self.level = level;
        }
        if let Some(name) = fields.name {
            self.name = name;
        }
        if let Some(color) = fields.color {
            self.color = color;
        }
        if let Some(prefix) = fields.prefix {
            self.prefix = prefix;
        }
        if let Some(prefix_color) = fields.prefix_color {
            self.prefix_color = prefix_color;
        }
        *self != before
    }

    fn is_listed(&self) -> bool {
        self.visible && self.level == 0
    }
}

/// Per-buffer nick roster kept in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    nicks: Vec<Nick>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nick for `handle`, creating a default one when unknown.
    /// The flag is true only when the entry was created by this call.
    pub fn get_or_create(&mut self, handle: NickHandle) -> (&mut Nick, bool) {
        match self.position(handle) {
            Some(index) => (&mut self.nicks[index], false),
            None => {
                self.nicks.push(Nick::new(handle));
                let index = self.nicks.len() - 1;
                (&mut self.nicks[index], true)
            }
        }
    }

    pub fn get(&self, handle: NickHandle) -> Option<&Nick> {
        self.nicks.iter().find(|nick| nick.handle == handle)
    }

    pub fn contains(&self, handle: NickHandle) -> bool {
        self.position(handle).is_some()
    }

    pub fn remove(&mut self, handle: NickHandle) -> Option<Nick> {
        self.position(handle).map(|index| self.nicks.remove(index))
    }

    pub fn clear(&mut self) -> bool {
        let had_entries = !self.nicks.is_empty();
        self.nicks.clear();
        had_entries
    }

    /// Names for completion and name lists: visible top-level entries, unsorted.
    pub fn visible_names(&self) -> Vec<String> {
        self.nicks
            .iter()
            .filter(|nick| nick.is_listed())
            .map(|nick| nick.name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nick> {
        self.nicks.iter()
    }

    pub fn len(&self) -> usize {
        self.nicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nicks.is_empty()
    }

    fn position(&self, handle: NickHandle) -> Option<usize> {
        self.nicks.iter().position(|nick| nick.handle == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(roster: &mut Roster, raw: u64, name: &str, visible: bool, level: u32) {
        let (nick, _) = roster.get_or_create(NickHandle::new(raw));
        nick.apply_fields(NickFields {
            visible: Some(visible),
            level: Some(level),
            name: Some(name.to_string()),
            ..NickFields::default()
        });
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut roster = Roster::new();
        let (_, created) = roster.get_or_create(NickHandle::new(7));
        assert!(created);
        let (nick, created) = roster.get_or_create(NickHandle::new(7));
        assert!(!created);
        assert_eq!(nick.handle, NickHandle::new(7));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn visible_names_keeps_visible_top_level_in_creation_order() {
        let mut roster = Roster::new();
        named(&mut roster, 1, "zed", true, 0);
        named(&mut roster, 2, "hidden", false, 0);
        named(&mut roster, 3, "grouped", true, 1);
        named(&mut roster, 4, "amy", true, 0);
        assert_eq!(roster.visible_names(), vec!["zed", "amy"]);
    }

    #[test]
    fn remove_and_clear_are_explicit() {
        let mut roster = Roster::new();
        named(&mut roster, 1, "a", true, 0);
        named(&mut roster, 2, "b", true, 0);

        let removed = roster.remove(NickHandle::new(1));
        assert_eq!(removed.map(|nick| nick.name), Some("a".to_string()));
        assert!(roster.remove(NickHandle::new(1)).is_none());
        assert!(roster.contains(NickHandle::new(2)));

        assert!(roster.clear());
        assert!(!roster.clear());
        assert!(roster.is_empty());
    }

    #[test]
    fn apply_fields_reports_changes() {
        let mut nick = Nick::new(NickHandle::new(9));
        assert!(nick.apply_fields(NickFields {
            name: Some("bob".to_string()),
            ..NickFields::default()
        }));
        assert!(!nick.apply_fields(NickFields {
            name: Some("bob".to_string()),
            ..NickFields::default()
        }));
        assert!(!nick.apply_fields(NickFields::default()));
    }
}
