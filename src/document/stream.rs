//! # Document Iterators & Stream Pipeline
//!
//! An iterator is anything that can push documents through a callback. A
//! [`Stream`] wraps an iterator with a chain of operators, each a stateful
//! transform `document -> document | skip | stop | error`.
//!
//! Operators are installed as factories: every call to `iterate` asks each
//! factory for a fresh state object, so a composed stream can be traversed
//! any number of times. Traversal is single-pass and single-threaded.
//!
//! Early termination is an explicit [`Flow::Stop`] signal, distinct from
//! the error channel. A stop unwinds the pipeline and `iterate` returns
//! `Ok`; any error aborts the traversal and surfaces to the caller.

use crate::document::FieldBuffer;
use eyre::Result;
use std::rc::Rc;

/// Continuation signal returned by iteration callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// A producer of documents.
pub trait DocumentIterator {
    /// Calls `f` for each document until exhaustion, an error, or `f`
    /// returns [`Flow::Stop`].
    fn iterate(&self, f: &mut dyn FnMut(FieldBuffer<'static>) -> Result<Flow>) -> Result<()>;
}

/// Decision of a stream operator for one document.
pub enum StreamControl {
    /// Pass this document downstream.
    Pass(FieldBuffer<'static>),
    /// Drop this document and continue.
    Skip,
    /// Terminate the traversal without error.
    Stop,
}

/// Per-traversal operator state.
pub type OpFn<'s> = Box<dyn FnMut(FieldBuffer<'static>) -> Result<StreamControl> + 's>;

/// Operator factory: produces one [`OpFn`] per traversal so streams stay
/// reusable.
pub type StreamOperator<'s> = Box<dyn Fn() -> OpFn<'s> + 's>;

/// A lazy document pipeline: an upstream iterator plus one operator.
/// Chaining operators nests streams.
pub struct Stream<'s> {
    it: Box<dyn DocumentIterator + 's>,
    op: Option<StreamOperator<'s>>,
}

impl<'s> Stream<'s> {
    pub fn new(it: impl DocumentIterator + 's) -> Self {
        Self {
            it: Box::new(it),
            op: None,
        }
    }

    /// A stream over an in-memory document list.
    pub fn from_documents(docs: Vec<FieldBuffer<'static>>) -> Self {
        Self::new(DocumentsIter(docs))
    }

    /// Wraps this stream with a custom operator.
    pub fn pipe(self, op: StreamOperator<'s>) -> Stream<'s> {
        Stream {
            it: Box::new(self),
            op: Some(op),
        }
    }

    /// Replaces every document with `f(document)`.
    pub fn map<F>(self, f: F) -> Stream<'s>
    where
        F: Fn(FieldBuffer<'static>) -> Result<FieldBuffer<'static>> + 's,
    {
        let f = Rc::new(f);
        self.pipe(Box::new(move || {
            let f = Rc::clone(&f);
            Box::new(move |doc| Ok(StreamControl::Pass(f(doc)?)))
        }))
    }

    /// Keeps only documents for which `pred` returns true.
    pub fn filter<F>(self, pred: F) -> Stream<'s>
    where
        F: Fn(&FieldBuffer<'static>) -> Result<bool> + 's,
    {
        let pred = Rc::new(pred);
        self.pipe(Box::new(move || {
            let pred = Rc::clone(&pred);
            Box::new(move |doc| {
                if pred(&doc)? {
                    Ok(StreamControl::Pass(doc))
                } else {
                    Ok(StreamControl::Skip)
                }
            })
        }))
    }

    /// Stops the traversal after `n` documents have passed.
    pub fn limit(self, n: usize) -> Stream<'s> {
        self.pipe(Box::new(move || {
            let mut passed = 0usize;
            Box::new(move |doc| {
                if passed < n {
                    passed += 1;
                    Ok(StreamControl::Pass(doc))
                } else {
                    Ok(StreamControl::Stop)
                }
            })
        }))
    }

    /// Drops the first `n` documents.
    pub fn offset(self, n: usize) -> Stream<'s> {
        self.pipe(Box::new(move || {
            let mut skipped = 0usize;
            Box::new(move |doc| {
                if skipped < n {
                    skipped += 1;
                    Ok(StreamControl::Skip)
                } else {
                    Ok(StreamControl::Pass(doc))
                }
            })
        }))
    }

    /// Concatenates another iterator after this stream.
    pub fn append(self, it: impl DocumentIterator + 's) -> Stream<'s> {
        Stream::new(MultiIterator {
            parts: vec![Box::new(self), Box::new(it)],
        })
    }

    /// Counts the documents the pipeline produces.
    pub fn count(&self) -> Result<usize> {
        let mut n = 0usize;
        self.iterate(&mut |_| {
            n += 1;
            Ok(Flow::Continue)
        })?;
        Ok(n)
    }

    /// Returns the first document the pipeline produces, if any.
    pub fn first(&self) -> Result<Option<FieldBuffer<'static>>> {
        let mut found = None;
        self.iterate(&mut |doc| {
            found = Some(doc);
            Ok(Flow::Stop)
        })?;
        Ok(found)
    }
}

impl DocumentIterator for Stream<'_> {
    fn iterate(&self, f: &mut dyn FnMut(FieldBuffer<'static>) -> Result<Flow>) -> Result<()> {
        match &self.op {
            None => self.it.iterate(f),
            Some(factory) => {
                let mut op = factory();
                self.it.iterate(&mut |doc| match op(doc)? {
                    StreamControl::Pass(doc) => f(doc),
                    StreamControl::Skip => Ok(Flow::Continue),
                    StreamControl::Stop => Ok(Flow::Stop),
                })
            }
        }
    }
}

struct DocumentsIter(Vec<FieldBuffer<'static>>);

impl DocumentIterator for DocumentsIter {
    fn iterate(&self, f: &mut dyn FnMut(FieldBuffer<'static>) -> Result<Flow>) -> Result<()> {
        for doc in &self.0 {
            if let Flow::Stop = f(doc.clone())? {
                return Ok(());
            }
        }
        Ok(())
    }
}

struct MultiIterator<'s> {
    parts: Vec<Box<dyn DocumentIterator + 's>>,
}

impl DocumentIterator for MultiIterator<'_> {
    fn iterate(&self, f: &mut dyn FnMut(FieldBuffer<'static>) -> Result<Flow>) -> Result<()> {
        let mut stopped = false;
        for it in &self.parts {
            it.iterate(&mut |doc| {
                let flow = f(doc)?;
                if let Flow::Stop = flow {
                    stopped = true;
                }
                Ok(flow)
            })?;
            if stopped {
                break;
            }
        }
        Ok(())
    }
}
