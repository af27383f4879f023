//! Grouping stages.
//!
//! Both stages route every element to a sub-chain chosen by a key computed
//! from the element, and emit `(key, sub-chain result...)` per group. The
//! sub-composition is validated once at bind time and instantiated again
//! for every new key.
//!
//! - [`group_by`] groups runs of adjacent equal keys and emits each group
//!   as soon as the key changes.
//! - [`map_group_by`] groups all equal keys and emits every group at end of
//!   input, in the configured [`GroupOrder`].

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::bundle::{Bundle, ViewFn};
use crate::ownership::{Arg, Finalized};
use crate::pipeline::{
    bind_chain, build_chain, BindContext, Bound, Chain, Composition, Feed, GroupOrder,
    IntoStages, Next, Result, Shape, Slot, Stage, StageDescriptor, StageInstance, Style,
};
use crate::value::{IntoValue, Value};

use super::{callback_arity_error, expect_arity};

/// Group runs of adjacent elements with equal `key` and run each run
/// through a fresh instance of `sub`.
///
/// ```
/// use sluice::{apply, count, group_by, to_vec, Value};
///
/// let out = apply(
///     Value::list([1, 1, 2, 1]),
///     (group_by(|x: &Value| x.clone(), count()), to_vec()),
/// )
/// .unwrap();
/// assert_eq!(
///     out.into_value(),
///     Value::list([Value::pair(1, 2), Value::pair(2, 1), Value::pair(1, 1)])
/// );
/// ```
pub fn group_by<M, F>(key: F, sub: impl IntoStages) -> Stage
where
    M: 'static,
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    group(key, sub, Scope::Adjacent)
}

/// Group all elements with equal `key`, in the configured group order.
pub fn map_group_by<M, F>(key: F, sub: impl IntoStages) -> Stage
where
    M: 'static,
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    group(key, sub, Scope::Global(None))
}

/// Like [`map_group_by`], with an explicit emission order.
pub fn map_group_by_with<M, F>(order: GroupOrder, key: F, sub: impl IntoStages) -> Stage
where
    M: 'static,
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    group(key, sub, Scope::Global(Some(order)))
}

fn group<M, F>(key: F, sub: impl IntoStages, scope: Scope) -> Stage
where
    M: 'static,
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    Stage::new(GroupDescriptor {
        key,
        sub: crate::pipeline::compose(sub),
        scope,
        _marker: std::marker::PhantomData,
    })
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Adjacent,
    Global(Option<GroupOrder>),
}

struct GroupDescriptor<M, F> {
    key: F,
    sub: Composition,
    scope: Scope,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageDescriptor for GroupDescriptor<M, F>
where
    M: 'static,
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    fn name(&self) -> &'static str {
        match self.scope {
            Scope::Adjacent => "group_by",
            Scope::Global(_) => "map_group_by",
        }
    }

    fn style(&self) -> Style {
        Style::INCREMENTAL_TO_INCREMENTAL
    }

    fn stage_count(&self) -> usize {
        1 + self.sub.stage_count()
    }

    fn bind(&self, input: &Shape, cx: &BindContext) -> Result<Bound> {
        expect_arity(cx, self.name(), F::ARITY, input)?;
        let scx = cx.nested("/group");
        let spare = build_chain(Feed::Elements(input.clone()), &self.sub, &scx)?;
        let output = spare
            .result()
            .clone()
            .prepend(Slot::owned(F::Output::kind()));
        let chains = SubChains {
            sub: self.sub.clone(),
            feed: input.clone(),
            cx: scx,
            spare: Some(spare),
        };
        let path = cx.path().to_string();

        let bound = match self.scope {
            Scope::Adjacent => Bound::new(
                GroupBy {
                    key: self.key.clone(),
                    chains,
                    current: None,
                    path,
                    _marker: std::marker::PhantomData,
                },
                output,
            ),
            Scope::Global(order) => Bound::new(
                MapGroupBy {
                    key: self.key.clone(),
                    chains,
                    groups: Vec::new(),
                    index: Index::new(order.unwrap_or(cx.config().group_order)),
                    path,
                    _marker: std::marker::PhantomData,
                },
                output,
            ),
        };
        Ok(bound)
    }
}

/// Source of sub-chain instances. The chain bound during validation is
/// handed out first.
struct SubChains {
    sub: Composition,
    feed: Shape,
    cx: BindContext,
    spare: Option<Chain>,
}

impl SubChains {
    fn open(&mut self) -> Result<Chain> {
        match self.spare.take() {
            Some(chain) => Ok(chain),
            None => {
                debug_event!(path = self.cx.path(), "binding group sub-chain");
                bind_chain(Feed::Elements(self.feed.clone()), &self.sub, &self.cx)
            }
        }
    }
}

fn group_key<M, F>(key: &mut F, input: &Bundle<'_>, path: &str) -> Result<Value>
where
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    input
        .invoke_view(key)
        .map(IntoValue::into_value)
        .ok_or_else(|| callback_arity_error(path, "group key"))
}

/// Finish a group's sub-chain and emit `(key, result...)`.
fn emit(key: Value, mut chain: Chain, next: Next<'_>) -> Result<()> {
    if next.done() {
        return Ok(());
    }
    let result = chain.finish()?;
    next.process_incremental(result.into_bundle().prepend(Arg::Owned(key)))
}

// ─── Adjacent groups ────────────────────────────────────────────────────────

struct GroupBy<M, F> {
    key: F,
    chains: SubChains,
    current: Option<(Value, Chain)>,
    path: String,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageInstance for GroupBy<M, F>
where
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    fn process_incremental(&mut self, input: Bundle<'_>, mut next: Next<'_>) -> Result<()> {
        let key = group_key::<M, F>(&mut self.key, &input, &self.path)?;
        let same = matches!(&self.current, Some((current, _)) if *current == key);
        if !same {
            if let Some((done_key, chain)) = self.current.take() {
                emit(done_key, chain, next.reborrow())?;
            }
            if next.done() {
                return Ok(());
            }
            self.current = Some((key, self.chains.open()?));
        }
        match self.current.as_mut() {
            Some((_, chain)) if !chain.done() => chain.push(input),
            _ => Ok(()),
        }
    }

    fn end(&mut self, mut next: Next<'_>) -> Result<Finalized<'static>> {
        if let Some((key, chain)) = self.current.take() {
            emit(key, chain, next.reborrow())?;
        }
        next.end()
    }
}

// ─── Global groups ──────────────────────────────────────────────────────────

/// Key to group position, in a structure matching the emission order.
enum Index {
    FirstSeen(FxHashMap<Value, usize>),
    Sorted(BTreeMap<Value, usize>),
    Hashed(FxHashMap<Value, usize>),
}

impl Index {
    fn new(order: GroupOrder) -> Self {
        match order {
            GroupOrder::FirstSeen => Index::FirstSeen(FxHashMap::default()),
            GroupOrder::Sorted => Index::Sorted(BTreeMap::new()),
            GroupOrder::Hashed => Index::Hashed(FxHashMap::default()),
        }
    }

    fn get(&self, key: &Value) -> Option<usize> {
        match self {
            Index::FirstSeen(map) | Index::Hashed(map) => map.get(key).copied(),
            Index::Sorted(map) => map.get(key).copied(),
        }
    }

    fn insert(&mut self, key: Value, position: usize) {
        match self {
            Index::FirstSeen(map) | Index::Hashed(map) => {
                map.insert(key, position);
            }
            Index::Sorted(map) => {
                map.insert(key, position);
            }
        }
    }

    /// Group positions in emission order.
    fn order(&self, len: usize) -> Vec<usize> {
        match self {
            Index::FirstSeen(_) => (0..len).collect(),
            Index::Sorted(map) => map.values().copied().collect(),
            Index::Hashed(map) => map.values().copied().collect(),
        }
    }
}

struct MapGroupBy<M, F> {
    key: F,
    chains: SubChains,
    groups: Vec<(Value, Chain)>,
    index: Index,
    path: String,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, F> StageInstance for MapGroupBy<M, F>
where
    F: ViewFn<M>,
    F::Output: IntoValue,
{
    fn process_incremental(&mut self, input: Bundle<'_>, _next: Next<'_>) -> Result<()> {
        let key = group_key::<M, F>(&mut self.key, &input, &self.path)?;
        let position = match self.index.get(&key) {
            Some(position) => position,
            None => {
                let position = self.groups.len();
                self.groups.push((key.clone(), self.chains.open()?));
                self.index.insert(key, position);
                position
            }
        };
        match self.groups.get_mut(position) {
            Some((_, chain)) if !chain.done() => chain.push(input),
            _ => Ok(()),
        }
    }

    fn end(&mut self, mut next: Next<'_>) -> Result<Finalized<'static>> {
        let order = self.index.order(self.groups.len());
        debug_event!(path = %self.path, groups = order.len(), "flushing groups");
        let mut groups: Vec<Option<(Value, Chain)>> =
            std::mem::take(&mut self.groups).into_iter().map(Some).collect();
        for position in order {
            if next.done() {
                break;
            }
            if let Some((key, chain)) = groups.get_mut(position).and_then(Option::take) {
                emit(key, chain, next.reborrow())?;
            }
        }
        next.end()
    }
}
