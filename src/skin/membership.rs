//! Sparse per-(geometry, influence) membership table.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{SkinError, SkinResult};
use super::ids::{GeometryIndex, InfluenceIndex, RecordKey};
use super::solver::Coordinates;

/// Edit semantics for [`MembershipStore::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipMode {
    /// Recompute listed components, keeping the weight of existing members.
    Replace,
    /// Insert listed components that are not members yet.
    Add,
    /// Rebuild the record from the listed components only.
    Set,
    /// Delete listed components.
    Remove,
}

impl MembershipMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Add => "add",
            Self::Set => "set",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for MembershipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for MembershipMode {
    type Error = SkinError;

    /// Legacy numeric flag: `0` replace, `1` add, `2` set, `3` remove.
    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        match flag {
            0 => Ok(Self::Replace),
            1 => Ok(Self::Add),
            2 => Ok(Self::Set),
            3 => Ok(Self::Remove),
            other => Err(SkinError::InvalidMode(other.to_string())),
        }
    }
}

impl FromStr for MembershipMode {
    type Err = SkinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" | "0" => Ok(Self::Replace),
            "add" | "1" => Ok(Self::Add),
            "set" | "2" => Ok(Self::Set),
            "remove" | "3" => Ok(Self::Remove),
            _ => Err(SkinError::InvalidMode(s.to_owned())),
        }
    }
}

/// Weight and attachment coordinate of one member.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Member {
    pub weight: f64,
    pub u: f64,
    pub v: f64,
}

/// Four parallel arrays sorted by component index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub index: Vec<usize>,
    pub weight: Vec<f64>,
    pub u: Vec<f64>,
    pub v: Vec<f64>,
}

impl MembershipRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from members keyed by component; the map order is the
    /// array order.
    #[must_use]
    pub fn from_members(members: &BTreeMap<usize, Member>) -> Self {
        let mut record = Self {
            index: Vec::with_capacity(members.len()),
            weight: Vec::with_capacity(members.len()),
            u: Vec::with_capacity(members.len()),
            v: Vec::with_capacity(members.len()),
        };
        for (&component, member) in members {
            record.index.push(component);
            record.weight.push(member.weight);
            record.u.push(member.u);
            record.v.push(member.v);
        }
        record
    }

    #[must_use]
    pub fn members(&self) -> BTreeMap<usize, Member> {
        self.index
            .iter()
            .zip(&self.weight)
            .zip(self.u.iter().zip(&self.v))
            .map(|((&c, &weight), (&u, &v))| (c, Member { weight, u, v }))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Lengths of the index, weight, u and v arrays.
    #[must_use]
    pub fn lengths(&self) -> [usize; 4] {
        [self.index.len(), self.weight.len(), self.u.len(), self.v.len()]
    }

    /// Equal array lengths and a strictly increasing index array.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let [n, w, u, v] = self.lengths();
        n == w && n == u && n == v && self.index.windows(2).all(|pair| pair[0] < pair[1])
    }

    #[must_use]
    pub fn contains(&self, component: usize) -> bool {
        self.index.binary_search(&component).is_ok()
    }

    #[must_use]
    pub fn member(&self, component: usize) -> Option<Member> {
        let at = self.index.binary_search(&component).ok()?;
        Some(Member {
            weight: *self.weight.get(at)?,
            u: *self.u.get(at)?,
            v: *self.v.get(at)?,
        })
    }
}

/// Arena of membership records keyed by `(geometry, influence)`.
#[derive(Debug, Clone, Default)]
pub struct MembershipStore {
    records: HashMap<RecordKey, MembershipRecord>,
}

impl MembershipStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn record(&self, key: RecordKey) -> Option<&MembershipRecord> {
        self.records.get(&key)
    }

    /// Every record ordered by key.
    #[must_use]
    pub fn records(&self) -> Vec<(RecordKey, &MembershipRecord)> {
        let mut all: Vec<_> = self.records.iter().map(|(k, r)| (*k, r)).collect();
        all.sort_unstable_by_key(|(key, _)| *key);
        all
    }

    /// Keys of every record ordered.
    #[must_use]
    pub fn keys(&self) -> Vec<RecordKey> {
        let mut keys: Vec<_> = self.records.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get_index_array(&self, key: RecordKey) -> &[usize] {
        self.records.get(&key).map_or(&[][..], |r| r.index.as_slice())
    }

    #[must_use]
    pub fn get_weight_array(&self, key: RecordKey) -> &[f64] {
        self.records.get(&key).map_or(&[][..], |r| r.weight.as_slice())
    }

    #[must_use]
    pub fn get_u_array(&self, key: RecordKey) -> &[f64] {
        self.records.get(&key).map_or(&[][..], |r| r.u.as_slice())
    }

    #[must_use]
    pub fn get_v_array(&self, key: RecordKey) -> &[f64] {
        self.records.get(&key).map_or(&[][..], |r| r.v.as_slice())
    }

    // Raw writes; consistency is only checked by the next `update` or `validate`.

    pub fn set_index_array(&mut self, key: RecordKey, values: Vec<usize>) {
        self.records.entry(key).or_default().index = values;
    }

    pub fn set_weight_array(&mut self, key: RecordKey, values: Vec<f64>) {
        self.records.entry(key).or_default().weight = values;
    }

    pub fn set_u_array(&mut self, key: RecordKey, values: Vec<f64>) {
        self.records.entry(key).or_default().u = values;
    }

    pub fn set_v_array(&mut self, key: RecordKey, values: Vec<f64>) {
        self.records.entry(key).or_default().v = values;
    }

    /// Fails with [`SkinError::ArrayLengthMismatch`] when the stored arrays of
    /// `key` disagree in length. A missing record is consistent.
    pub fn validate(&self, key: RecordKey) -> SkinResult<()> {
        let Some(record) = self.records.get(&key) else {
            return Ok(());
        };
        let lengths = record.lengths();
        if lengths.iter().all(|&n| n == lengths[0]) {
            Ok(())
        } else {
            Err(SkinError::ArrayLengthMismatch {
                geometry: key.0,
                influence: key.1,
                lengths,
            })
        }
    }

    /// Apply one membership edit to the record at `key`.
    ///
    /// `compute` receives the components that need coordinates and returns the
    /// coordinates it could solve; components it leaves out are treated as
    /// rejected. The merged record is written back in one step, sorted.
    pub fn update<F>(
        &mut self,
        key: RecordKey,
        components: &[usize],
        default_weight: f64,
        mode: MembershipMode,
        compute: F,
    ) -> SkinResult<()>
    where
        F: FnOnce(&[usize]) -> SkinResult<Coordinates>,
    {
        self.validate(key)?;

        let requested: Vec<usize> = components
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut members = self
            .records
            .get(&key)
            .map(MembershipRecord::members)
            .unwrap_or_default();
        let before = members.len();

        match mode {
            MembershipMode::Replace => {
                let solved = compute(&requested)?;
                for (component, (u, v)) in solved {
                    members
                        .entry(component)
                        .and_modify(|m| {
                            m.u = u;
                            m.v = v;
                        })
                        .or_insert(Member {
                            weight: default_weight,
                            u,
                            v,
                        });
                }
            }
            MembershipMode::Add => {
                let missing: Vec<usize> = requested
                    .iter()
                    .copied()
                    .filter(|c| !members.contains_key(c))
                    .collect();
                if !missing.is_empty() {
                    for (component, (u, v)) in compute(&missing)? {
                        members.insert(
                            component,
                            Member {
                                weight: default_weight,
                                u,
                                v,
                            },
                        );
                    }
                }
            }
            MembershipMode::Set => {
                let solved = compute(&requested)?;
                members = solved
                    .into_iter()
                    .map(|(component, (u, v))| {
                        let weight = members
                            .get(&component)
                            .map_or(default_weight, |m| m.weight);
                        (component, Member { weight, u, v })
                    })
                    .collect();
            }
            MembershipMode::Remove => {
                for component in &requested {
                    members.remove(component);
                }
            }
        }

        log::debug!(
            "membership {mode} on geometry {} / influence {}: {before} -> {} member(s)",
            key.0,
            key.1,
            members.len()
        );
        self.records
            .insert(key, MembershipRecord::from_members(&members));
        Ok(())
    }

    pub fn remove_record(&mut self, key: RecordKey) -> Option<MembershipRecord> {
        self.records.remove(&key)
    }

    /// Drop every record keyed by `influence`; returns how many were dropped.
    pub fn clear_influence(&mut self, influence: InfluenceIndex) -> usize {
        let before = self.records.len();
        self.records.retain(|(_, inf), _| *inf != influence);
        before - self.records.len()
    }

    /// Drop every record keyed by `geometry`; returns how many were dropped.
    pub fn clear_geometry(&mut self, geometry: GeometryIndex) -> usize {
        let before = self.records.len();
        self.records.retain(|(geo, _), _| *geo != geometry);
        before - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: RecordKey = (GeometryIndex(0), InfluenceIndex(0));

    fn solve_all(components: &[usize]) -> SkinResult<Coordinates> {
        Ok(components
            .iter()
            .map(|&c| (c, (0.1 * c as f64, 0.5)))
            .collect())
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(MembershipMode::try_from(2).unwrap(), MembershipMode::Set);
        assert_eq!("Remove".parse::<MembershipMode>().unwrap(), MembershipMode::Remove);
        assert_eq!(
            MembershipMode::try_from(4).unwrap_err(),
            SkinError::InvalidMode("4".to_owned())
        );
        assert!("merge".parse::<MembershipMode>().is_err());
    }

    #[test]
    fn update_writes_sorted_arrays() {
        let mut store = MembershipStore::new();
        store
            .update(KEY, &[4, 1, 3, 1], 0.5, MembershipMode::Add, solve_all)
            .unwrap();
        assert_eq!(store.get_index_array(KEY), &[1, 3, 4]);
        assert_eq!(store.get_weight_array(KEY), &[0.5, 0.5, 0.5]);
        assert!(store.record(KEY).unwrap().is_consistent());
    }

    #[test]
    fn raw_setters_are_checked_before_merge() {
        let mut store = MembershipStore::new();
        store.set_index_array(KEY, vec![0, 1]);
        store.set_weight_array(KEY, vec![1.0]);
        let err = store
            .update(KEY, &[2], 1.0, MembershipMode::Add, solve_all)
            .unwrap_err();
        assert_eq!(
            err,
            SkinError::ArrayLengthMismatch {
                geometry: GeometryIndex(0),
                influence: InfluenceIndex(0),
                lengths: [2, 1, 0, 0],
            }
        );
        assert_eq!(store.get_index_array(KEY), &[0, 1]);
    }

    #[test]
    fn add_with_nothing_new_skips_solver() {
        let mut store = MembershipStore::new();
        store
            .update(KEY, &[0, 1], 1.0, MembershipMode::Add, solve_all)
            .unwrap();
        store
            .update(KEY, &[1, 0], 1.0, MembershipMode::Add, |_| {
                panic!("nothing to solve")
            })
            .unwrap();
        assert_eq!(store.get_index_array(KEY), &[0, 1]);
    }

    #[test]
    fn clearing_by_influence_and_geometry() {
        let mut store = MembershipStore::new();
        for g in 0..2 {
            for i in 0..2 {
                store
                    .update(
                        (GeometryIndex(g), InfluenceIndex(i)),
                        &[0],
                        1.0,
                        MembershipMode::Set,
                        solve_all,
                    )
                    .unwrap();
            }
        }
        assert_eq!(store.clear_influence(InfluenceIndex(1)), 2);
        assert_eq!(store.clear_geometry(GeometryIndex(0)), 1);
        assert_eq!(store.keys(), vec![(GeometryIndex(1), InfluenceIndex(0))]);
    }

    #[test]
    fn member_lookup() {
        let record = MembershipRecord {
            index: vec![2, 5],
            weight: vec![0.3, 0.7],
            u: vec![0.1, 0.2],
            v: vec![0.4, 0.6],
        };
        assert_eq!(
            record.member(5),
            Some(Member {
                weight: 0.7,
                u: 0.2,
                v: 0.6
            })
        );
        assert!(record.member(3).is_none());
        assert_eq!(MembershipRecord::from_members(&record.members()), record);
    }
}
