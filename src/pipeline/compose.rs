//! Stage compositions.
//!
//! Anything [`IntoStages`] flattens into one ordered list: a single
//! [`Stage`], a [`Composition`], a `Vec`, or tuples of up to 12 of those.

use super::traits::Stage;

/// An ordered, flattened list of stages.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    stages: Vec<Stage>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Total stage count, nested sub-chains included.
    pub fn stage_count(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.descriptor().stage_count())
            .sum()
    }

    pub fn then(mut self, stages: impl IntoStages) -> Self {
        stages.append_to(&mut self.stages);
        self
    }
}

impl From<Stage> for Composition {
    fn from(stage: Stage) -> Self {
        compose(stage)
    }
}

/// Flatten `stages` into one composition.
pub fn compose(stages: impl IntoStages) -> Composition {
    let mut out = Vec::new();
    stages.append_to(&mut out);
    Composition { stages: out }
}

/// Something that contributes stages to a composition.
pub trait IntoStages {
    fn append_to(self, out: &mut Vec<Stage>);
}

impl IntoStages for Stage {
    fn append_to(self, out: &mut Vec<Stage>) {
        out.push(self);
    }
}

impl IntoStages for Composition {
    fn append_to(self, out: &mut Vec<Stage>) {
        out.extend(self.stages);
    }
}

impl IntoStages for &Composition {
    fn append_to(self, out: &mut Vec<Stage>) {
        out.extend(self.stages.iter().cloned());
    }
}

impl<T: IntoStages> IntoStages for Vec<T> {
    fn append_to(self, out: &mut Vec<Stage>) {
        for item in self {
            item.append_to(out);
        }
    }
}

impl IntoStages for () {
    fn append_to(self, _out: &mut Vec<Stage>) {}
}

macro_rules! tuple_stages {
    ($($name:ident),+) => {
        impl<$($name: IntoStages),+> IntoStages for ($($name,)+) {
            #[allow(non_snake_case)]
            fn append_to(self, out: &mut Vec<Stage>) {
                let ($($name,)+) = self;
                $($name.append_to(out);)+
            }
        }
    };
}

tuple_stages!(A);
tuple_stages!(A, B);
tuple_stages!(A, B, C);
tuple_stages!(A, B, C, D);
tuple_stages!(A, B, C, D, E);
tuple_stages!(A, B, C, D, E, F);
tuple_stages!(A, B, C, D, E, F, G);
tuple_stages!(A, B, C, D, E, F, G, H);
tuple_stages!(A, B, C, D, E, F, G, H, I);
tuple_stages!(A, B, C, D, E, F, G, H, I, J);
tuple_stages!(A, B, C, D, E, F, G, H, I, J, K);
tuple_stages!(A, B, C, D, E, F, G, H, I, J, K, L);

/// A list of independent compositions, one per tee branch.
///
/// A tuple is one branch per element; a `Vec` is one branch per item.
pub trait IntoBranches {
    fn into_branches(self) -> Vec<Composition>;
}

impl<T: IntoStages> IntoBranches for Vec<T> {
    fn into_branches(self) -> Vec<Composition> {
        self.into_iter().map(compose).collect()
    }
}

macro_rules! tuple_branches {
    ($($name:ident),+) => {
        impl<$($name: IntoStages),+> IntoBranches for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_branches(self) -> Vec<Composition> {
                let ($($name,)+) = self;
                vec![$(compose($name)),+]
            }
        }
    };
}

tuple_branches!(A);
tuple_branches!(A, B);
tuple_branches!(A, B, C);
tuple_branches!(A, B, C, D);
tuple_branches!(A, B, C, D, E);
tuple_branches!(A, B, C, D, E, F);
tuple_branches!(A, B, C, D, E, F, G);
tuple_branches!(A, B, C, D, E, F, G, H);
