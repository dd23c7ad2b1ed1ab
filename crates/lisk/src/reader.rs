//! Reader: builds the value graph for one s-expression from the token stream.

use crate::{
    builtins::Builtin,
    error::{Error, EvalResult},
    heap::Heap,
    intern::{Interner, SymbolId},
    lexer::{Lexer, Token},
    value::Value,
};

pub(crate) struct Reader<'a, 'b> {
    lexer: Lexer<'a>,
    heap: &'b mut Heap,
    interner: &'b mut Interner,
}

impl<'a, 'b> Reader<'a, 'b> {
    pub fn new(source: &'a str, heap: &'b mut Heap, interner: &'b mut Interner) -> Self {
        Self {
            lexer: Lexer::new(source),
            heap,
            interner,
        }
    }

    /// Reads one complete expression and returns its root value.
    pub fn read(&mut self) -> EvalResult<Value> {
        let Some(token) = self.lexer.advance()? else {
            return Err(Error::syntax("unexpected end of input"));
        };
        match token {
            Token::Int(value) => Ok(Value::Int(value)),
            Token::Bool(value) => Ok(Value::Bool(value)),
            Token::Symbol(name) => Ok(Value::Symbol(self.interner.intern(&name))),
            Token::Quote => {
                let quoted = self.read()?;
                let quote = Value::Symbol(SymbolId::from_builtin(Builtin::Quote));
                Ok(self.heap.allocate_list(vec![quote, quoted], Value::Nil))
            }
            Token::OpenParen => self.read_list(),
            Token::CloseParen => Err(Error::syntax("unmatched `)`")),
            Token::Dot => Err(Error::syntax("`.` outside of a list")),
        }
    }

    /// Fails unless every token has been consumed.
    pub fn finish(&mut self) -> EvalResult<()> {
        if self.lexer.is_end()? {
            Ok(())
        } else {
            Err(Error::syntax("trailing tokens after expression"))
        }
    }

    /// Reads list elements up to the matching `)`. `()` is the empty list; a
    /// dot after at least one element introduces the final cdr.
    fn read_list(&mut self) -> EvalResult<Value> {
        let mut elements = Vec::new();
        loop {
            if self.lexer.is_end()? {
                return Err(Error::syntax("unmatched `(`"));
            }
            if self.lexer.consume_if(&Token::CloseParen)? {
                return Ok(self.heap.allocate_list(elements, Value::Nil));
            }
            if self.lexer.consume_if(&Token::Dot)? {
                if elements.is_empty() {
                    return Err(Error::syntax("nothing before `.` in a list"));
                }
                return self.read_dotted_tail(elements);
            }
            elements.push(self.read()?);
        }
    }

    /// Reads exactly one expression after a dot, then the closing `)`.
    fn read_dotted_tail(&mut self, elements: Vec<Value>) -> EvalResult<Value> {
        if self.lexer.is_end()? {
            return Err(Error::syntax("unmatched `(`"));
        }
        if self.lexer.consume_if(&Token::CloseParen)? {
            return Err(Error::syntax("missing expression after `.`"));
        }
        if self.lexer.consume_if(&Token::Dot)? {
            return Err(Error::syntax("`.` repeated in a list"));
        }
        let tail = self.read()?;
        match self.lexer.advance()? {
            Some(Token::CloseParen) => Ok(self.heap.allocate_list(elements, tail)),
            Some(_) => Err(Error::syntax("expected `)` after the dotted tail")),
            None => Err(Error::syntax("unmatched `(`")),
        }
    }
}
