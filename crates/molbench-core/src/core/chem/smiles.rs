use super::{ChemError, DEFAULT_FINGERPRINT_BITS, MoleculeValidator, Validation};
use crate::core::models::fingerprint::Fingerprint;
use std::collections::HashMap;

/// Atoms and bonds recovered from a SMILES string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MolecularGraph {
    pub atoms: Vec<String>,
    /// `(from, to, bond symbol)`; implicit single bonds are recorded as `'-'`.
    pub bonds: Vec<(usize, usize, char)>,
}

impl MolecularGraph {
    fn neighbors(&self) -> Vec<Vec<(usize, char)>> {
        let mut adjacency = vec![Vec::new(); self.atoms.len()];
        for &(a, b, bond) in &self.bonds {
            adjacency[a].push((b, bond));
            adjacency[b].push((a, bond));
        }
        adjacency
    }
}

struct OpenBranch {
    anchor: usize,
    atoms_at_open: usize,
    position: usize,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    graph: MolecularGraph,
    prev: Option<usize>,
    pending_bond: Option<(char, usize)>,
    branches: Vec<OpenBranch>,
    rings: HashMap<u32, (usize, Option<char>)>,
}

fn is_bond(c: char) -> bool {
    matches!(c, '-' | '=' | '#' | '$' | ':' | '/' | '\\')
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            graph: MolecularGraph::default(),
            prev: None,
            pending_bond: None,
            branches: Vec::new(),
            rings: HashMap::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn unexpected(&self) -> ChemError {
        ChemError::UnexpectedCharacter {
            character: self.chars[self.pos],
            position: self.pos,
        }
    }

    fn parse(mut self) -> Result<MolecularGraph, ChemError> {
        if self.chars.is_empty() {
            return Err(ChemError::Empty);
        }
        while let Some(c) = self.peek(0) {
            match c {
                '[' => {
                    let symbol = self.bracket_atom()?;
                    self.push_atom(symbol)?;
                }
                '(' => self.open_branch()?,
                ')' => self.close_branch()?,
                '.' => self.disconnect()?,
                '%' | '0'..='9' => self.ring_closure()?,
                c if is_bond(c) => {
                    if self.prev.is_none() || self.pending_bond.is_some() {
                        return Err(ChemError::DanglingBond { position: self.pos });
                    }
                    self.pending_bond = Some((c, self.pos));
                    self.pos += 1;
                }
                _ => {
                    let symbol = self.organic_atom()?;
                    self.push_atom(symbol)?;
                }
            }
        }
        if let Some((_, position)) = self.pending_bond {
            return Err(ChemError::DanglingBond { position });
        }
        if let Some(branch) = self.branches.last() {
            return Err(ChemError::Branch {
                position: branch.position,
            });
        }
        if let Some(&label) = self.rings.keys().min() {
            return Err(ChemError::RingClosure { label });
        }
        if self.prev.is_none() {
            return Err(ChemError::Truncated);
        }
        Ok(self.graph)
    }

    fn organic_atom(&mut self) -> Result<String, ChemError> {
        let c = self.chars[self.pos];
        let two = match (c, self.peek(1)) {
            ('C', Some('l')) => Some("Cl"),
            ('B', Some('r')) => Some("Br"),
            _ => None,
        };
        if let Some(symbol) = two {
            self.pos += 2;
            return Ok(symbol.to_string());
        }
        match c {
            'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' | 'b' | 'c' | 'n' | 'o' | 'p' | 's'
            | '*' => {
                self.pos += 1;
                Ok(c.to_string())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn bracket_atom(&mut self) -> Result<String, ChemError> {
        let start = self.pos;
        let close = self.chars[start..]
            .iter()
            .position(|&c| c == ']')
            .map(|offset| start + offset)
            .ok_or(ChemError::BracketAtom { position: start })?;
        let content: String = self.chars[start + 1..close].iter().collect();
        let element = content.trim_start_matches(|c: char| c.is_ascii_digit());
        let valid_start = element
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '*');
        let valid_chars = content
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '+' | '-' | ':' | '*'));
        if !valid_start || !valid_chars {
            return Err(ChemError::BracketAtom { position: start });
        }
        self.pos = close + 1;
        Ok(content)
    }

    fn push_atom(&mut self, symbol: String) -> Result<(), ChemError> {
        let index = self.graph.atoms.len();
        self.graph.atoms.push(symbol);
        match (self.prev, self.pending_bond.take()) {
            (Some(prev), bond) => {
                let bond = bond.map_or('-', |(c, _)| c);
                self.graph.bonds.push((prev, index, bond));
            }
            (None, Some((_, position))) => return Err(ChemError::DanglingBond { position }),
            (None, None) => {}
        }
        self.prev = Some(index);
        Ok(())
    }

    fn open_branch(&mut self) -> Result<(), ChemError> {
        let anchor = match self.prev {
            Some(anchor) if self.pending_bond.is_none() => anchor,
            _ => return Err(ChemError::Branch { position: self.pos }),
        };
        self.branches.push(OpenBranch {
            anchor,
            atoms_at_open: self.graph.atoms.len(),
            position: self.pos,
        });
        self.pos += 1;
        Ok(())
    }

    fn close_branch(&mut self) -> Result<(), ChemError> {
        let position = self.pos;
        if self.pending_bond.is_some() {
            return Err(ChemError::Branch { position });
        }
        let branch = self
            .branches
            .pop()
            .ok_or(ChemError::Branch { position })?;
        if self.graph.atoms.len() == branch.atoms_at_open {
            return Err(ChemError::Branch { position });
        }
        self.prev = Some(branch.anchor);
        self.pos += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ChemError> {
        if self.prev.is_none() || self.pending_bond.is_some() || !self.branches.is_empty() {
            return Err(self.unexpected());
        }
        self.prev = None;
        self.pos += 1;
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), ChemError> {
        let atom = match self.prev {
            Some(atom) => atom,
            None => return Err(self.unexpected()),
        };
        let label = if self.chars[self.pos] == '%' {
            let digits: Option<u32> = match (self.peek(1), self.peek(2)) {
                (Some(a), Some(b)) => a.to_digit(10).zip(b.to_digit(10)).map(|(a, b)| a * 10 + b),
                _ => None,
            };
            let label = digits.ok_or(ChemError::UnexpectedCharacter {
                character: '%',
                position: self.pos,
            })?;
            self.pos += 3;
            label
        } else {
            let digit = self.chars[self.pos].to_digit(10).unwrap_or_default();
            self.pos += 1;
            digit
        };
        let bond = self.pending_bond.take().map(|(c, _)| c);
        match self.rings.remove(&label) {
            Some((opened_at, open_bond)) => {
                if opened_at == atom {
                    return Err(ChemError::RingClosure { label });
                }
                let bond = bond.or(open_bond).unwrap_or('-');
                self.graph.bonds.push((opened_at, atom, bond));
            }
            None => {
                self.rings.insert(label, (atom, bond));
            }
        }
        Ok(())
    }
}

/// Parses a SMILES string into its molecular graph.
pub fn parse_smiles(smiles: &str) -> Result<MolecularGraph, ChemError> {
    Parser::new(smiles.trim()).parse()
}

/// Grammar-level SMILES validator with a hashed atom-path fingerprint.
///
/// Canonicalisation is the identity on trimmed input; plug a toolkit-backed
/// [`MoleculeValidator`] in when chemically canonical strings are needed.
#[derive(Debug, Clone, Copy)]
pub struct SmilesSyntaxValidator {
    n_bits: usize,
}

impl Default for SmilesSyntaxValidator {
    fn default() -> Self {
        Self {
            n_bits: DEFAULT_FINGERPRINT_BITS,
        }
    }
}

impl SmilesSyntaxValidator {
    pub fn new(n_bits: usize) -> Self {
        Self { n_bits: n_bits.max(1) }
    }

    /// Sets one bit per atom, per bonded pair and per two-bond path.
    fn fingerprint(&self, graph: &MolecularGraph) -> Fingerprint {
        let n = self.n_bits as u64;
        let mut fp = Fingerprint::zeros(self.n_bits);
        let mut set = |feature: &str| fp.set((fnv1a(feature.as_bytes()) % n) as usize);

        for atom in &graph.atoms {
            set(&format!("A|{}", atom));
        }
        for &(a, b, bond) in &graph.bonds {
            let (lo, hi) = ordered(&graph.atoms[a], &graph.atoms[b]);
            set(&format!("B|{}{}{}", lo, bond, hi));
        }
        for (center, neighbors) in graph.neighbors().iter().enumerate() {
            for (i, &(a, bond_a)) in neighbors.iter().enumerate() {
                for &(b, bond_b) in &neighbors[i + 1..] {
                    let left = format!("{}{}", graph.atoms[a], bond_a);
                    let right = format!("{}{}", graph.atoms[b], bond_b);
                    let (lo, hi) = ordered(&left, &right);
                    set(&format!("P|{}|{}|{}", lo, graph.atoms[center], hi));
                }
            }
        }
        fp
    }
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

impl MoleculeValidator for SmilesSyntaxValidator {
    fn validate(&self, smiles: &str) -> Validation {
        match parse_smiles(smiles) {
            Ok(graph) => Validation {
                is_valid: true,
                canonical: Some(smiles.trim().to_string()),
                fingerprint: self.fingerprint(&graph),
            },
            Err(_) => Validation {
                is_valid: false,
                canonical: None,
                fingerprint: Fingerprint::zeros(self.n_bits),
            },
        }
    }

    fn fingerprint_bits(&self) -> usize {
        self.n_bits
    }
}
