//! Cell-reference graph of a [`GdsLibrary`].

use std::collections::{HashMap, HashSet};

use arcstr::ArcStr;
use gds21::GdsLibrary;

/// Which cells instantiate which, by name.
///
/// Built once from a library and not updated as the library changes.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// Defined cells, in declaration order.
    cells: Vec<ArcStr>,
    /// Names instantiated by each defined cell, deduplicated, in first-reference order.
    children: HashMap<ArcStr, Vec<ArcStr>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

impl Hierarchy {
    pub fn new(lib: &GdsLibrary) -> Self {
        let mut cells = Vec::with_capacity(lib.structs.len());
        let mut children = HashMap::with_capacity(lib.structs.len());
        for strukt in lib.structs.iter() {
            let mut seen = HashSet::new();
            let kids: Vec<ArcStr> = strukt
                .struct_ref_names()
                .filter(|name| seen.insert(*name))
                .cloned()
                .collect();
            cells.push(strukt.name.clone());
            children
                .entry(strukt.name.clone())
                .or_insert_with(Vec::new)
                .extend(kids);
        }
        Self { cells, children }
    }

    /// Defined cell names, in declaration order.
    pub fn cells(&self) -> &[ArcStr] {
        &self.cells
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Names directly instantiated by `name`. Empty for undefined cells.
    pub fn children(&self, name: &str) -> &[ArcStr] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names instantiated by at least one defined cell.
    pub fn referenced(&self) -> HashSet<ArcStr> {
        self.children.values().flatten().cloned().collect()
    }

    /// Cells instantiated by no other cell, in declaration order.
    pub fn top_cells(&self) -> Vec<ArcStr> {
        let referenced: HashSet<&ArcStr> = self
            .children
            .iter()
            .flat_map(|(parent, kids)| kids.iter().filter(move |kid| *kid != parent))
            .collect();
        self.cells
            .iter()
            .filter(|name| !referenced.contains(name))
            .cloned()
            .collect()
    }

    /// Defined cells reachable from `roots`, in depth-first visiting order.
    ///
    /// Only cells accepted by `filter` are visited, and only their children are descended into.
    pub fn reachable_from<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a ArcStr>,
        filter: impl Fn(&str) -> bool,
    ) -> Vec<ArcStr> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<&ArcStr> = roots.into_iter().collect();
        stack.reverse();
        while let Some(name) = stack.pop() {
            if !self.contains(name) || !filter(name.as_str()) || !seen.insert(name.clone()) {
                continue;
            }
            order.push(name.clone());
            stack.extend(self.children(name).iter().rev());
        }
        order
    }

    /// A reference cycle, if any, as the path of names from a cell back to itself.
    pub fn find_cycle(&self) -> Option<Vec<ArcStr>> {
        let mut marks = HashMap::new();
        let mut path = Vec::new();
        self.cells
            .iter()
            .find_map(|name| self.visit(name, &mut marks, &mut path))
    }

    fn visit<'a>(
        &'a self,
        name: &'a ArcStr,
        marks: &mut HashMap<&'a ArcStr, Mark>,
        path: &mut Vec<&'a ArcStr>,
    ) -> Option<Vec<ArcStr>> {
        match marks.get(name) {
            Some(Mark::Done) => return None,
            Some(Mark::Active) => {
                // `name` is on the current path; the cycle starts at its first occurrence.
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<ArcStr> = path[start..].iter().map(|n| (*n).clone()).collect();
                cycle.push(name.clone());
                return Some(cycle);
            }
            None => (),
        }
        if !self.contains(name) {
            return None;
        }
        marks.insert(name, Mark::Active);
        path.push(name);
        for kid in self.children(name) {
            if let Some(cycle) = self.visit(kid, marks, path) {
                return Some(cycle);
            }
        }
        path.pop();
        marks.insert(name, Mark::Done);
        None
    }

    /// Names instantiated somewhere but defined nowhere, sorted.
    pub fn dangling(&self) -> Vec<ArcStr> {
        let mut names: Vec<ArcStr> = self
            .referenced()
            .into_iter()
            .filter(|name| !self.contains(name))
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use gds21::{GdsPoint, GdsStruct, GdsStructRef};

    use super::*;

    fn cell(name: &str, refs: &[&str]) -> GdsStruct {
        let mut s = GdsStruct::new(name);
        for r in refs {
            s.elems.push(
                GdsStructRef {
                    name: (*r).into(),
                    xy: GdsPoint::new(0, 0),
                    ..Default::default()
                }
                .into(),
            );
        }
        s
    }

    fn names(names: &[&str]) -> Vec<ArcStr> {
        names.iter().map(|n| ArcStr::from(*n)).collect()
    }

    fn lib(cells: Vec<GdsStruct>) -> GdsLibrary {
        let mut lib = GdsLibrary::new("lib");
        lib.structs = cells;
        lib
    }

    #[test]
    fn tops_and_reachability() {
        let lib = lib(vec![
            cell("a", &[]),
            cell("top", &["mid", "a", "mid"]),
            cell("mid", &["a"]),
            cell("other", &[]),
        ]);
        let h = Hierarchy::new(&lib);
        assert_eq!(h.children("top"), names(&["mid", "a"]).as_slice());
        assert_eq!(h.top_cells(), names(&["top", "other"]));
        let top = ArcStr::from("top");
        assert_eq!(h.reachable_from([&top], |_| true), names(&["top", "mid", "a"]));
        assert_eq!(h.reachable_from([&top], |n| n != "mid"), names(&["top", "a"]));
        assert!(h.find_cycle().is_none());
        assert!(h.dangling().is_empty());
    }

    #[test]
    fn cycles() {
        let lib = lib(vec![
            cell("top", &["x"]),
            cell("x", &["y"]),
            cell("y", &["x"]),
        ]);
        let cycle = Hierarchy::new(&lib).find_cycle().unwrap();
        assert_eq!(cycle, names(&["x", "y", "x"]));

        let lib = self::lib(vec![cell("me", &["me"])]);
        let h = Hierarchy::new(&lib);
        assert_eq!(h.find_cycle().unwrap(), names(&["me", "me"]));
        assert!(h.top_cells().contains(&ArcStr::from("me")));
    }

    #[test]
    fn dangling() {
        let lib = lib(vec![cell("top", &["zz", "missing", "zz"])]);
        let h = Hierarchy::new(&lib);
        assert_eq!(h.dangling(), names(&["missing", "zz"]));
        assert_eq!(h.referenced().len(), 2);
    }
}
