//! A line-oriented cursor over a template blob that can also switch to raw
//! byte consumption mid-stream — needed by `~d`, whose bitmap payload
//! follows the directive line but isn't itself line-structured.

pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Return the next `\n`-terminated line (without its terminator),
    /// advancing past it, or `None` at end of input.
    pub fn next_line(&mut self) -> Option<&'a str> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let newline_at = rest.iter().position(|&b| b == b'\n');
        let (line, advance) = match newline_at {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        std::str::from_utf8(line).ok()
    }

    /// Remaining unconsumed bytes, for the bitmap payload reader.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_lines_without_terminators() {
        let mut cur = Cursor::new(b"~S 54,40\n~P 1,D\n");
        assert_eq!(cur.next_line(), Some("~S 54,40"));
        assert_eq!(cur.next_line(), Some("~P 1,D"));
        assert_eq!(cur.next_line(), None);
    }

    #[test]
    fn last_line_without_trailing_newline_is_returned() {
        let mut cur = Cursor::new(b"~P 1,D");
        assert_eq!(cur.next_line(), Some("~P 1,D"));
        assert_eq!(cur.next_line(), None);
    }

    #[test]
    fn advance_exposes_remaining_bytes_for_binary_payloads() {
        let mut cur = Cursor::new(b"~d 0,0\nABCDE");
        cur.next_line();
        assert_eq!(cur.remaining(), b"ABCDE");
        cur.advance(3);
        assert_eq!(cur.remaining(), b"DE");
    }
}
