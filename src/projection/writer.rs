//! Streaming JSON document writer.
//!
//! Emits JSON text incrementally into an in-memory buffer while tracking the
//! open containers, so callers can never close a list as a dict or leave a
//! key without a value. Scalar and row encoding is delegated to serde_json.

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("no open list to close")]
    NotInList,

    #[error("no open dict to close")]
    NotInDict,

    #[error("a key must precede each value inside a dict")]
    KeyRequired,

    #[error("key {0:?} has no value")]
    DanglingKey(String),

    #[error("document already has a root value")]
    MultipleRoots,

    #[error("document has {0} unclosed containers")]
    Unterminated(usize),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug)]
enum Frame {
    List { empty: bool },
    Dict { empty: bool, key: Option<String> },
}

#[derive(Debug, Default)]
pub struct DocumentWriter {
    out: Vec<u8>,
    stack: Vec<Frame>,
    root_written: bool,
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_list(&mut self) -> Result<(), WriterError> {
        self.before_value()?;
        self.stack.push(Frame::List { empty: true });
        self.out.push(b'[');
        Ok(())
    }

    pub fn end_list(&mut self) -> Result<(), WriterError> {
        match self.stack.last() {
            Some(Frame::List { .. }) => {
                self.stack.pop();
                self.out.push(b']');
                Ok(())
            }
            _ => Err(WriterError::NotInList),
        }
    }

    pub fn begin_dict(&mut self) -> Result<(), WriterError> {
        self.before_value()?;
        self.stack.push(Frame::Dict {
            empty: true,
            key: None,
        });
        self.out.push(b'{');
        Ok(())
    }

    pub fn end_dict(&mut self) -> Result<(), WriterError> {
        match self.stack.last() {
            Some(Frame::Dict { key: Some(key), .. }) => Err(WriterError::DanglingKey(key.clone())),
            Some(Frame::Dict { .. }) => {
                self.stack.pop();
                self.out.push(b'}');
                Ok(())
            }
            _ => Err(WriterError::NotInDict),
        }
    }

    /// Write a key inside the innermost dict. The next value belongs to it.
    pub fn key(&mut self, name: &str) -> Result<(), WriterError> {
        let Some(Frame::Dict { empty, key }) = self.stack.last_mut() else {
            return Err(WriterError::NotInDict);
        };
        if let Some(pending) = key {
            return Err(WriterError::DanglingKey(pending.clone()));
        }
        if !*empty {
            self.out.push(b',');
        }
        *empty = false;
        *key = Some(name.to_string());
        serde_json::to_writer(&mut self.out, name)?;
        self.out.push(b':');
        Ok(())
    }

    /// Write a complete value at the current position.
    pub fn value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), WriterError> {
        self.before_value()?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    pub fn null(&mut self) -> Result<(), WriterError> {
        self.value(&())
    }

    pub fn in_list(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::List { .. }))
    }

    pub fn in_dict(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Dict { .. }))
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Bytes written so far, possibly an incomplete document.
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Consume the writer, returning the document once every container is closed.
    pub fn finish(self) -> Result<Vec<u8>, WriterError> {
        if !self.stack.is_empty() {
            return Err(WriterError::Unterminated(self.stack.len()));
        }
        Ok(self.out)
    }

    fn before_value(&mut self) -> Result<(), WriterError> {
        match self.stack.last_mut() {
            None => {
                if self.root_written {
                    return Err(WriterError::MultipleRoots);
                }
                self.root_written = true;
            }
            Some(Frame::List { empty }) => {
                if !*empty {
                    self.out.push(b',');
                }
                *empty = false;
            }
            Some(Frame::Dict { key, .. }) => {
                if key.take().is_none() {
                    return Err(WriterError::KeyRequired);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(writer: DocumentWriter) -> String {
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_nested_document() {
        let mut w = DocumentWriter::new();
        w.begin_dict().unwrap();
        w.key("profile").unwrap();
        w.value("alice").unwrap();
        w.key("things").unwrap();
        w.begin_list().unwrap();
        w.value(&1).unwrap();
        w.begin_dict().unwrap();
        w.key("a").unwrap();
        w.null().unwrap();
        w.end_dict().unwrap();
        w.end_list().unwrap();
        w.end_dict().unwrap();

        assert_eq!(text(w), r#"{"profile":"alice","things":[1,{"a":null}]}"#);
    }

    #[test]
    fn test_key_escaping() {
        let mut w = DocumentWriter::new();
        w.begin_dict().unwrap();
        w.key("say \"hi\"").unwrap();
        w.value(&true).unwrap();
        w.end_dict().unwrap();
        assert_eq!(text(w), r#"{"say \"hi\"":true}"#);
    }

    #[test]
    fn test_misuse_is_rejected() {
        let mut w = DocumentWriter::new();
        w.begin_dict().unwrap();
        assert!(matches!(w.value(&1), Err(WriterError::KeyRequired)));
        assert!(matches!(w.end_list(), Err(WriterError::NotInList)));
        w.key("k").unwrap();
        assert!(matches!(w.end_dict(), Err(WriterError::DanglingKey(_))));
        assert!(matches!(w.finish(), Err(WriterError::Unterminated(1))));
    }

    #[test]
    fn test_single_root() {
        let mut w = DocumentWriter::new();
        w.value("ok").unwrap();
        assert!(matches!(w.begin_list(), Err(WriterError::MultipleRoots)));
        assert_eq!(w.depth(), 0);
        assert_eq!(text(w), r#""ok""#);
    }
}
