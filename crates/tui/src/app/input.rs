use unicode_segmentation::UnicodeSegmentation;

/// Chat textbox contents. `cursor` counts graphemes, not bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert_text(&mut self, s: &str) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        let mut new_text = parts[..idx].concat();
        new_text.push_str(s);
        new_text.push_str(&parts[idx..].concat());
        self.text = new_text;
        let added = s.graphemes(true).count();
        self.cursor = (idx + added).min(self.text.graphemes(true).count());
    }

    pub fn insert_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buf));
    }

    pub fn delete_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        parts.remove(idx - 1);
        self.text = parts.concat();
        self.cursor = idx - 1;
    }

    pub fn delete_right(&mut self) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let idx = self.cursor.min(parts.len());
        if idx < parts.len() {
            parts.remove(idx);
            self.text = parts.concat();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let len = self.text.graphemes(true).count();
        if self.cursor < len {
            self.cursor += 1;
        }
    }

    pub fn move_line_start(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let mut i = self.cursor.min(parts.len());
        while i > 0 && parts[i - 1] != "\n" {
            i -= 1;
        }
        self.cursor = i;
    }

    pub fn move_line_end(&mut self) {
        let parts: Vec<&str> = self.text.graphemes(true).collect();
        let mut i = self.cursor.min(parts.len());
        while i < parts.len() && parts[i] != "\n" {
            i += 1;
        }
        self.cursor = i;
    }

    pub fn delete_prev_word(&mut self) {
        let mut parts: Vec<&str> = self.text.graphemes(true).collect();
        let end = self.cursor.min(parts.len());
        let mut i = end;
        while i > 0 && parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        while i > 0 && !parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        parts.drain(i..end);
        self.text = parts.concat();
        self.cursor = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_at_cursor() {
        let mut b = InputBuffer::default();
        b.insert_text("helo");
        b.move_left();
        b.insert_char('l');
        assert_eq!(b.text(), "hello");
        assert_eq!(b.cursor(), 4);
    }

    #[test]
    fn deletes_graphemes_not_bytes() {
        let mut b = InputBuffer::default();
        b.insert_text("né👍");
        b.delete_left();
        assert_eq!(b.text(), "né");
        b.move_left();
        b.delete_right();
        assert_eq!(b.text(), "n");
        assert_eq!(b.cursor(), 1);
    }

    #[test]
    fn line_navigation_stops_at_newlines() {
        let mut b = InputBuffer::default();
        b.insert_text("one\ntwo");
        b.move_line_start();
        assert_eq!(b.cursor(), 4);
        b.move_left();
        b.move_line_start();
        assert_eq!(b.cursor(), 0);
        b.move_line_end();
        assert_eq!(b.cursor(), 3);
    }

    #[test]
    fn delete_prev_word_eats_trailing_space() {
        let mut b = InputBuffer::default();
        b.insert_text("say hello  ");
        b.delete_prev_word();
        assert_eq!(b.text(), "say ");
        assert!(!b.is_blank());
        b.clear();
        assert!(b.is_blank());
        assert_eq!(b.cursor(), 0);
    }
}
