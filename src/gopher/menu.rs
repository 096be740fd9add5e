//! Menu data model.
//!
//! # Responsibilities
//! - Model info lines, item lines and pre-formatted raw lines
//! - Validate item fields against the protocol's field separators
//! - Serialize a menu as CRLF-joined lines
//!
//! # Design Decisions
//! - Entry order is display order; entries are never reordered
//! - Serialization does not append the `.` terminator (the application does)

use std::fmt;
use thiserror::Error;

/// Placeholder host used on lines that do not point anywhere.
pub const DUMMY_HOST: &str = "error.host";

/// Placeholder port used on lines that do not point anywhere.
pub const DUMMY_PORT: u16 = 0;

/// Item type tag of a menu line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Text,
    Directory,
    CsoPhoneBook,
    Error,
    BinHex,
    Dos,
    UuEncoded,
    Search,
    Telnet,
    Binary,
    Mirror,
    Gif,
    Image,
    Tn3270,
    Html,
    Info,
    Sound,
    Document,
    /// Any tag without a dedicated variant.
    Other(char),
}

impl ItemType {
    /// The single character written on the wire.
    pub fn as_char(&self) -> char {
        match self {
            ItemType::Text => '0',
            ItemType::Directory => '1',
            ItemType::CsoPhoneBook => '2',
            ItemType::Error => '3',
            ItemType::BinHex => '4',
            ItemType::Dos => '5',
            ItemType::UuEncoded => '6',
            ItemType::Search => '7',
            ItemType::Telnet => '8',
            ItemType::Binary => '9',
            ItemType::Mirror => '+',
            ItemType::Gif => 'g',
            ItemType::Image => 'I',
            ItemType::Tn3270 => 'T',
            ItemType::Html => 'h',
            ItemType::Info => 'i',
            ItemType::Sound => 's',
            ItemType::Document => 'd',
            ItemType::Other(c) => *c,
        }
    }
}

impl From<char> for ItemType {
    fn from(c: char) -> Self {
        match c {
            '0' => ItemType::Text,
            '1' => ItemType::Directory,
            '2' => ItemType::CsoPhoneBook,
            '3' => ItemType::Error,
            '4' => ItemType::BinHex,
            '5' => ItemType::Dos,
            '6' => ItemType::UuEncoded,
            '7' => ItemType::Search,
            '8' => ItemType::Telnet,
            '9' => ItemType::Binary,
            '+' => ItemType::Mirror,
            'g' => ItemType::Gif,
            'I' => ItemType::Image,
            'T' => ItemType::Tn3270,
            'h' => ItemType::Html,
            'i' => ItemType::Info,
            's' => ItemType::Sound,
            'd' => ItemType::Document,
            other => ItemType::Other(other),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Rejected menu field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuError {
    /// A field contains a tab, CR or LF.
    #[error("menu field `{field}` contains a tab or line break")]
    Separator { field: &'static str },
}

fn check_field(field: &'static str, value: &str) -> Result<(), MenuError> {
    if value.contains(['\t', '\r', '\n']) {
        return Err(MenuError::Separator { field });
    }
    Ok(())
}

/// A navigable menu line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    item_type: ItemType,
    name: String,
    selector: String,
    host: String,
    port: u16,
}

impl MenuItem {
    /// Build an item, rejecting fields that would break the line format.
    pub fn new(
        item_type: impl Into<ItemType>,
        name: impl Into<String>,
        selector: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Result<Self, MenuError> {
        let item_type = item_type.into();
        let name = name.into();
        let selector = selector.into();
        let host = host.into();

        if matches!(item_type.as_char(), '\t' | '\r' | '\n') {
            return Err(MenuError::Separator { field: "type" });
        }
        check_field("name", &name)?;
        check_field("selector", &selector)?;
        check_field("host", &host)?;

        Ok(Self {
            item_type,
            name,
            selector,
            host,
            port,
        })
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}\t{}\t{}\t{}",
            self.item_type, self.name, self.selector, self.host, self.port
        )
    }
}

/// Text of an info line. Never contains tabs or line breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoText(String);

impl InfoText {
    pub fn new(text: impl Into<String>) -> Result<Self, MenuError> {
        let text = text.into();
        check_field("text", &text)?;
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InfoText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// Informational text, rendered with dummy selector, host and port.
    Info(InfoText),
    /// A link to another resource.
    Item(MenuItem),
    /// A line that is already in wire format.
    Raw(String),
}

impl MenuEntry {
    /// Build an info line. The text may not contain tabs or line breaks.
    pub fn info(text: impl Into<String>) -> Result<Self, MenuError> {
        InfoText::new(text).map(MenuEntry::Info)
    }

    pub fn raw(line: impl Into<String>) -> Self {
        MenuEntry::Raw(line.into())
    }
}

impl From<MenuItem> for MenuEntry {
    fn from(item: MenuItem) -> Self {
        MenuEntry::Item(item)
    }
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuEntry::Info(text) => write!(f, "i{}\t\t{}\t{}", text, DUMMY_HOST, DUMMY_PORT),
            MenuEntry::Item(item) => item.fmt(f),
            MenuEntry::Raw(line) => f.write_str(line),
        }
    }
}

/// An ordered list of menu lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Menu {
    entries: Vec<MenuEntry>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: impl Into<MenuEntry>) {
        self.entries.push(entry.into());
    }

    /// Append an info line.
    pub fn info(mut self, text: impl Into<String>) -> Result<Self, MenuError> {
        self.entries.push(MenuEntry::info(text)?);
        Ok(self)
    }

    /// Append an item line.
    pub fn item(
        mut self,
        item_type: impl Into<ItemType>,
        name: impl Into<String>,
        selector: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Result<Self, MenuError> {
        let item = MenuItem::new(item_type, name, selector, host, port)?;
        self.entries.push(MenuEntry::Item(item));
        Ok(self)
    }

    /// Append a pre-formatted line.
    pub fn raw(mut self, line: impl Into<String>) -> Self {
        self.entries.push(MenuEntry::raw(line));
        self
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MenuEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Join the serialized entries with CRLF, without a trailing terminator.
    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\r\n")?;
            }
            entry.fmt(f)?;
        }
        Ok(())
    }
}

impl From<Vec<MenuEntry>> for Menu {
    fn from(entries: Vec<MenuEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<MenuEntry> for Menu {
    fn from_iter<I: IntoIterator<Item = MenuEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<MenuEntry> for Menu {
    fn extend<I: IntoIterator<Item = MenuEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for Menu {
    type Item = MenuEntry;
    type IntoIter = std::vec::IntoIter<MenuEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Menu {
    type Item = &'a MenuEntry;
    type IntoIter = std::slice::Iter<'a, MenuEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
