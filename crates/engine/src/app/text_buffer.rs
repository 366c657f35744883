//! Line-addressed editing buffer for the in-world code editor.
//!
//! Invariants held after every operation:
//! - `lines` is never empty (an empty buffer is one empty line);
//! - `cursor_line < lines.len()`;
//! - `cursor_col <= char count of lines[cursor_line]`.
//!
//! Columns count `char`s, not bytes.

pub const MAX_LINE_CHARS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    lines: Vec<String>,
    cursor_line: usize,
    cursor_col: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
        }
    }
}

impl TextBuffer {
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut buffer = Self::default();
        buffer.reset(lines);
        buffer
    }

    /// Replaces the contents and puts the cursor at the start.
    pub fn reset<S: AsRef<str>>(&mut self, lines: &[S]) {
        self.lines = lines.iter().map(|line| line.as_ref().to_string()).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.cursor_line = 0;
        self.cursor_col = 0;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// `(line, column)` of the cursor.
    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_line, self.cursor_col)
    }

    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }

    pub fn insert_newline(&mut self) {
        let split_at = self.byte_offset(self.cursor_line, self.cursor_col);
        let tail = self.lines[self.cursor_line].split_off(split_at);
        self.lines.insert(self.cursor_line + 1, tail);
        self.cursor_line += 1;
        self.cursor_col = 0;
    }

    pub fn backspace(&mut self) {
        if self.cursor_col > 0 {
            let start = self.byte_offset(self.cursor_line, self.cursor_col - 1);
            self.lines[self.cursor_line].remove(start);
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            let previous = &mut self.lines[self.cursor_line];
            self.cursor_col = previous.chars().count();
            previous.push_str(&current);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor_col < self.line_len(self.cursor_line) {
            self.cursor_col += 1;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.cursor_col.min(self.line_len(self.cursor_line));
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = self.cursor_col.min(self.line_len(self.cursor_line));
        }
    }

    /// Inserts one printable character. Control characters and inserts past
    /// `MAX_LINE_CHARS` are ignored. Returns whether the buffer changed.
    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch.is_control() || self.line_len(self.cursor_line) >= MAX_LINE_CHARS {
            return false;
        }
        let at = self.byte_offset(self.cursor_line, self.cursor_col);
        self.lines[self.cursor_line].insert(at, ch);
        self.cursor_col += 1;
        true
    }

    pub fn insert_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.insert_char(ch);
        }
    }

    fn line_len(&self, line: usize) -> usize {
        self.lines[line].chars().count()
    }

    fn byte_offset(&self, line: usize, col: usize) -> usize {
        let text = &self.lines[line];
        text.char_indices()
            .nth(col)
            .map(|(offset, _)| offset)
            .unwrap_or(text.len())
    }
}
