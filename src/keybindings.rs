//! Keyboard shortcuts for article and list pages.
//!
//! Shortcuts are space separated key sequences (`"g u"`). Typing is matched
//! against the table as it happens; a pause longer than
//! [`KEY_SEQUENCE_TIMEOUT_MS`] throws away a half typed sequence.
//!
//! Besides the built-in table, page elements can declare their own sequences
//! with `data-shortcut="k1,k2"`: links are followed and forms submitted.
//! Entry list and original article targets are read from the page header
//! and the entry's date link when the page has them.

use feedview_dom::{Document, Key, NodeId};
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::constants::{attrs, classes, HEADER_ID, KEY_SEQUENCE_TIMEOUT_MS};

/// Things a shortcut can ask the host page to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "target", rename_all = "kebab-case")]
pub enum Action {
    /// Show the shortcut help panel
    ShowHelp,
    /// Hide the shortcut help panel
    HideHelp,
    /// Go to a URL
    Navigate(String),
    /// Go to the list of all entries
    ShowAll,
    /// Go to the list of unread entries
    ShowUnread,
    /// Reload the current page
    Reload,
    /// Open the original article of the entry being read
    OpenOriginal,
}

impl Action {
    /// Short description for the help panel.
    pub fn description(&self) -> String {
        match self {
            Action::ShowHelp => "Show keyboard shortcuts".to_string(),
            Action::HideHelp => "Hide keyboard shortcuts".to_string(),
            Action::Navigate(url) => format!("Go to {url}"),
            Action::ShowAll => "Show all entries".to_string(),
            Action::ShowUnread => "Show unread entries".to_string(),
            Action::Reload => "Reload page".to_string(),
            Action::OpenOriginal => "Open original article".to_string(),
        }
    }

    /// Only meaningful on an entry detail page.
    pub fn requires_detail_view(&self) -> bool {
        matches!(self, Action::OpenOriginal)
    }

    /// Target in the page markup, if the page provides one.
    fn page_target(&self, doc: &Document) -> Option<String> {
        let target = match self {
            Action::ShowAll => home_link(doc).and_then(|a| doc.attr(a, attrs::ALL_ENTRIES)),
            Action::ShowUnread => home_link(doc).and_then(|a| doc.attr(a, attrs::UNREAD_ENTRIES)),
            Action::OpenOriginal => doc
                .find_first(doc.root(), |d, n| {
                    d.is_tag(n, "a")
                        && d.parent(n)
                            .and_then(|p| d.closest(p, |d, x| d.has_class(x, classes::ENTRY_DATE)))
                            .is_some()
                })
                .and_then(|a| doc.attr(a, "href")),
            _ => None,
        };
        target.filter(|t| !t.is_empty()).map(str::to_string)
    }

    /// What the host does when the page has no target for this action.
    fn fallback(&self) -> Action {
        match self {
            Action::ShowAll => Action::Navigate(ALL_ENTRIES_PATH.to_string()),
            Action::ShowUnread => Action::Navigate(UNREAD_ENTRIES_PATH.to_string()),
            other => other.clone(),
        }
    }

    /// Resolve against the page: a page target is followed, otherwise the
    /// action is run as is.
    pub fn resolve(&self, doc: &Document) -> Command {
        match self.page_target(doc) {
            Some(url) => Command::Follow(url),
            None => Command::Run(self.fallback()),
        }
    }
}

const ALL_ENTRIES_PATH: &str = "/";
const UNREAD_ENTRIES_PATH: &str = "/unread/";

/// `#header a.home`
fn home_link(doc: &Document) -> Option<NodeId> {
    let header = doc.element_by_id(HEADER_ID)?;
    doc.find_first(header, |d, n| d.is_tag(n, "a") && d.has_class(n, classes::HOME_LINK))
}

/// Resolved outcome of a matched sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A built-in or user configured action
    Run(Action),
    /// Follow the `href` of a page link bound with `data-shortcut`
    Follow(String),
    /// Submit a form bound with `data-shortcut`
    Submit(NodeId),
}

/// Errors from parsing key sequences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyBindingError {
    #[error("Empty key sequence")]
    EmptySequence,

    #[error("Unknown key name {0:?}")]
    UnknownKey(String),
}

/// Parse `"g u"` into its keys.
pub fn parse_sequence(sequence: &str) -> Result<Vec<Key>, KeyBindingError> {
    let keys = sequence
        .split_whitespace()
        .map(|name| Key::from_name(name).ok_or_else(|| KeyBindingError::UnknownKey(name.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        return Err(KeyBindingError::EmptySequence);
    }
    Ok(keys)
}

/// Display name of a key, the inverse of [`Key::from_name`].
pub fn key_name(key: Key) -> String {
    match key {
        Key::Char(c) => c.to_string(),
        Key::Enter => "enter".to_string(),
        Key::Escape => "esc".to_string(),
        Key::Tab => "tab".to_string(),
        Key::Space => "space".to_string(),
        Key::Up => "up".to_string(),
        Key::Down => "down".to_string(),
        Key::Left => "left".to_string(),
        Key::Right => "right".to_string(),
    }
}

fn sequence_name(keys: &[Key]) -> String {
    keys.iter().map(|&k| key_name(k)).collect::<Vec<_>>().join(" ")
}

/// Built-in and user configured shortcut table.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBindings {
    bindings: Vec<(Vec<Key>, Action)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let defaults = [
            (vec![Key::Char('?')], Action::ShowHelp),
            (vec![Key::Escape], Action::HideHelp),
            (vec![Key::Char('g'), Key::Char('a')], Action::ShowAll),
            (vec![Key::Char('g'), Key::Char('u')], Action::ShowUnread),
            (vec![Key::Char('r')], Action::Reload),
            (vec![Key::Char('v')], Action::OpenOriginal),
        ];
        Self {
            bindings: defaults.into_iter().collect(),
        }
    }
}

impl KeyBindings {
    /// Create new keybindings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a sequence, replacing any existing binding for it.
    pub fn bind(&mut self, sequence: &str, action: Action) -> Result<(), KeyBindingError> {
        let keys = parse_sequence(sequence)?;
        match self.bindings.iter_mut().find(|(k, _)| *k == keys) {
            Some(entry) => entry.1 = action,
            None => self.bindings.push((keys, action)),
        }
        Ok(())
    }

    /// Action bound to a sequence, if any.
    pub fn action_for(&self, sequence: &str) -> Option<&Action> {
        let keys = parse_sequence(sequence).ok()?;
        self.bindings
            .iter()
            .find(|(k, _)| *k == keys)
            .map(|(_, action)| action)
    }

    /// `(sequence, description)` pairs for the help panel.
    pub fn help_entries(&self) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .map(|(keys, action)| (sequence_name(keys), action.description()))
            .collect()
    }

    pub fn bindings(&self) -> &[(Vec<Key>, Action)] {
        &self.bindings
    }
}

/// Incremental matcher for multi-key sequences.
#[derive(Debug, Clone)]
pub struct SequenceMatcher {
    buffer: Vec<Key>,
    last_press: Option<Duration>,
    timeout: Duration,
}

impl Default for SequenceMatcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(KEY_SEQUENCE_TIMEOUT_MS))
    }
}

impl SequenceMatcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffer: Vec::new(),
            last_press: None,
            timeout,
        }
    }

    /// Keys typed so far towards a longer sequence.
    pub fn pending(&self) -> &[Key] {
        &self.buffer
    }

    /// Feed one key press. Returns the bound value once a sequence completes.
    pub fn press<'a, T>(
        &mut self,
        key: Key,
        now: Duration,
        table: &'a [(Vec<Key>, T)],
    ) -> Option<&'a T> {
        if self
            .last_press
            .is_some_and(|last| now.saturating_sub(last) >= self.timeout)
        {
            self.buffer.clear();
        }
        self.last_press = Some(now);
        let had_partial = !self.buffer.is_empty();
        self.buffer.push(key);

        match self.step(table) {
            Step::Matched(value) => Some(value),
            Step::Partial => None,
            Step::Miss if had_partial => {
                // The key broke a partial sequence; it may start a new one
                self.buffer.push(key);
                match self.step(table) {
                    Step::Matched(value) => Some(value),
                    Step::Partial | Step::Miss => None,
                }
            }
            Step::Miss => None,
        }
    }

    fn step<'a, T>(&mut self, table: &'a [(Vec<Key>, T)]) -> Step<'a, T> {
        if let Some((_, value)) = table.iter().find(|(keys, _)| *keys == self.buffer) {
            self.buffer.clear();
            return Step::Matched(value);
        }
        let is_prefix = table
            .iter()
            .any(|(keys, _)| keys.len() > self.buffer.len() && keys.starts_with(&self.buffer));
        if is_prefix {
            Step::Partial
        } else {
            self.buffer.clear();
            Step::Miss
        }
    }
}

enum Step<'a, T> {
    Matched(&'a T),
    Partial,
    Miss,
}

/// Shortcut handling for one page: the configured table plus the sequences
/// declared by page elements.
#[derive(Debug, Clone)]
pub struct Shortcuts {
    table: Vec<(Vec<Key>, Command)>,
    matcher: SequenceMatcher,
}

impl Shortcuts {
    /// Build the table for a page.
    ///
    /// Actions that need an entry detail page are left out elsewhere. Page
    /// declared sequences take precedence over configured ones.
    pub fn install(doc: &Document, bindings: &KeyBindings, detail_view: bool) -> Self {
        let mut table: Vec<(Vec<Key>, Command)> = bindings
            .bindings()
            .iter()
            .filter(|(_, action)| detail_view || !action.requires_detail_view())
            .map(|(keys, action)| (keys.clone(), action.resolve(doc)))
            .collect();

        for element in doc.find_all(doc.root(), |d, n| d.attr(n, attrs::SHORTCUT).is_some()) {
            let Some(command) = element_command(doc, element) else {
                log::debug!("Element {:?} with shortcut is neither a link nor a form", element);
                continue;
            };
            let declared = doc.attr(element, attrs::SHORTCUT).unwrap_or_default();
            for sequence in declared.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match parse_sequence(sequence) {
                    Ok(keys) => {
                        table.retain(|(k, _)| *k != keys);
                        table.push((keys, command.clone()));
                    }
                    Err(e) => log::warn!("Ignoring page shortcut {:?}: {}", sequence, e),
                }
            }
        }

        log::debug!("Installed {} shortcuts", table.len());
        Self {
            table,
            matcher: SequenceMatcher::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Feed a key press at time `now`.
    pub fn handle_key(&mut self, key: Key, now: Duration) -> Option<Command> {
        self.matcher.press(key, now, &self.table).cloned()
    }
}

fn element_command(doc: &Document, element: NodeId) -> Option<Command> {
    match doc.tag(element)? {
        "a" => doc
            .attr(element, "href")
            .map(|href| Command::Follow(href.to_string())),
        "form" => Some(Command::Submit(element)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn type_keys(shortcuts: &mut Shortcuts, keys: &str, start: u64) -> Option<Command> {
        let mut result = None;
        for (i, key) in parse_sequence(keys).unwrap().into_iter().enumerate() {
            result = shortcuts.handle_key(key, ms(start + i as u64 * 100));
        }
        result
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(
            parse_sequence("g  u"),
            Ok(vec![Key::Char('g'), Key::Char('u')])
        );
        assert_eq!(parse_sequence(" "), Err(KeyBindingError::EmptySequence));
        assert_eq!(
            parse_sequence("ctrl+r"),
            Err(KeyBindingError::UnknownKey("ctrl+r".to_string()))
        );
    }

    #[test]
    fn test_default_table() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.action_for("?"), Some(&Action::ShowHelp));
        assert_eq!(bindings.action_for("esc"), Some(&Action::HideHelp));
        assert_eq!(bindings.action_for("g u"), Some(&Action::ShowUnread));
        assert_eq!(bindings.action_for("x"), None);
    }

    #[test]
    fn test_bind_replaces_existing_sequence() {
        let mut bindings = KeyBindings::new();
        let before = bindings.bindings().len();
        bindings.bind("r", Action::ShowHelp).unwrap();
        assert_eq!(bindings.bindings().len(), before);
        assert_eq!(bindings.action_for("r"), Some(&Action::ShowHelp));
    }

    #[test]
    fn test_two_key_sequence() {
        let doc = Document::new();
        let mut shortcuts = Shortcuts::install(&doc, &KeyBindings::new(), false);
        assert_eq!(
            type_keys(&mut shortcuts, "g a", 0),
            Some(Command::Run(Action::Navigate("/".to_string())))
        );
    }

    #[test]
    fn test_list_targets_come_from_home_link() {
        let doc = Document::parse_fragment(
            r#"<div id="header"><a class="home" href="/" data-all="/all/" data-unread="/unread-only/">home</a></div>"#,
        )
        .unwrap();
        let mut shortcuts = Shortcuts::install(&doc, &KeyBindings::new(), false);
        assert_eq!(
            type_keys(&mut shortcuts, "g a", 0),
            Some(Command::Follow("/all/".to_string()))
        );
        assert_eq!(
            type_keys(&mut shortcuts, "g u", 2000),
            Some(Command::Follow("/unread-only/".to_string()))
        );
    }

    #[test]
    fn test_home_link_outside_header_is_ignored() {
        let doc = Document::parse_fragment(r#"<a class="home" data-unread="/elsewhere/">home</a>"#)
            .unwrap();
        let mut shortcuts = Shortcuts::install(&doc, &KeyBindings::new(), false);
        assert_eq!(
            type_keys(&mut shortcuts, "g u", 0),
            Some(Command::Run(Action::Navigate("/unread/".to_string())))
        );
    }

    #[test]
    fn test_pause_resets_sequence() {
        let doc = Document::new();
        let mut shortcuts = Shortcuts::install(&doc, &KeyBindings::new(), false);
        assert_eq!(shortcuts.handle_key(Key::Char('g'), ms(0)), None);
        assert_eq!(shortcuts.handle_key(Key::Char('u'), ms(1500)), None);
    }

    #[test]
    fn test_broken_sequence_restarts_with_last_key() {
        let doc = Document::new();
        let mut shortcuts = Shortcuts::install(&doc, &KeyBindings::new(), false);
        assert_eq!(shortcuts.handle_key(Key::Char('g'), ms(0)), None);
        assert_eq!(
            shortcuts.handle_key(Key::Char('r'), ms(100)),
            Some(Command::Run(Action::Reload))
        );
    }

    #[test]
    fn test_open_original_only_in_detail_view() {
        let doc = Document::new();
        let mut list = Shortcuts::install(&doc, &KeyBindings::new(), false);
        assert_eq!(list.handle_key(Key::Char('v'), ms(0)), None);

        let mut detail = Shortcuts::install(&doc, &KeyBindings::new(), true);
        assert_eq!(
            detail.handle_key(Key::Char('v'), ms(0)),
            Some(Command::Run(Action::OpenOriginal))
        );
    }

    #[test]
    fn test_page_declared_shortcuts() {
        let doc = Document::parse_fragment(
            r#"<a href="/entries/next" data-shortcut="j, n">next</a><form data-shortcut="m r"></form><span data-shortcut="x"></span>"#,
        )
        .unwrap();
        let form = doc.find_first(doc.root(), |d, n| d.is_tag(n, "form")).unwrap();
        let mut shortcuts = Shortcuts::install(&doc, &KeyBindings::new(), false);

        assert_eq!(
            type_keys(&mut shortcuts, "n", 0),
            Some(Command::Follow("/entries/next".to_string()))
        );
        assert_eq!(
            type_keys(&mut shortcuts, "j", 1000),
            Some(Command::Follow("/entries/next".to_string()))
        );
        assert_eq!(type_keys(&mut shortcuts, "m r", 3000), Some(Command::Submit(form)));
        assert_eq!(type_keys(&mut shortcuts, "x", 5000), None);
    }

    #[test]
    fn test_page_shortcut_overrides_default() {
        let doc = Document::parse_fragment(r#"<a href="/refresh" data-shortcut="r">r</a>"#).unwrap();
        let mut shortcuts = Shortcuts::install(&doc, &KeyBindings::new(), false);
        assert_eq!(
            shortcuts.handle_key(Key::Char('r'), ms(0)),
            Some(Command::Follow("/refresh".to_string()))
        );
    }

    #[test]
    fn test_help_entries_use_key_names() {
        let entries = KeyBindings::new().help_entries();
        assert!(entries.iter().any(|(keys, _)| keys == "esc"));
        assert!(entries.iter().any(|(keys, _)| keys == "g u"));
    }
}
