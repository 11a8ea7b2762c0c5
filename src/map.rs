use std::collections::VecDeque;
use std::fmt;
use std::fs;

use anyhow::{anyhow, bail, Context};
use rand::Rng;

use crate::common::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    passable: bool,
}

impl Tile {
    pub fn is_passable(&self) -> bool {
        self.passable
    }
}

/// Static obstacle layout, indexed `grid[y][x]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Vec<Tile>>,
}

impl Map {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read map {path}"))?;
        Self::parse(&content).with_context(|| format!("malformed map file {path}"))
    }

    /// Parses the MovingAI `.map` layout: `type`, `height`, `width`, `map`
    /// headers followed by one line per row.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut lines = content.lines();

        let _type = lines.next().ok_or_else(|| anyhow!("missing type line"))?;
        let height = parse_header(lines.next(), "height")?;
        let width = parse_header(lines.next(), "width")?;
        match lines.next() {
            Some(line) if line.trim() == "map" => {}
            other => bail!("expected `map` line, got {other:?}"),
        }

        let mut grid = Vec::with_capacity(height);
        for (row, line) in lines.take(height).enumerate() {
            let tiles: Vec<Tile> = line
                .trim_end()
                .chars()
                .map(|ch| Tile {
                    passable: ch == '.' || ch == 'G',
                })
                .collect();
            if tiles.len() != width {
                bail!("row {row} has {} cells, expected {width}", tiles.len());
            }
            grid.push(tiles);
        }
        if grid.len() != height {
            bail!("found {} rows, expected {height}", grid.len());
        }

        Ok(Map {
            height,
            width,
            grid,
        })
    }

    pub fn open(width: usize, height: usize) -> Self {
        Map {
            height,
            width,
            grid: vec![vec![Tile { passable: true }; width]; height],
        }
    }

    /// Random obstacles, then everything outside the largest open region is
    /// filled so that any two open cells are mutually reachable.
    pub fn random_connected<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        obstacle_probability: f64,
        rng: &mut R,
    ) -> Self {
        let mut map = Map::open(width, height);
        for row in map.grid.iter_mut() {
            for tile in row.iter_mut() {
                tile.passable = !rng.gen_bool(obstacle_probability);
            }
        }

        let mut best: Vec<Position> = Vec::new();
        let mut seen = vec![vec![false; width]; height];
        for y in 0..height {
            for x in 0..width {
                if seen[y][x] || !map.grid[y][x].passable {
                    continue;
                }
                let region = map.flood((x, y), &mut seen);
                if region.len() > best.len() {
                    best = region;
                }
            }
        }

        let mut keep = vec![vec![false; width]; height];
        for &(x, y) in &best {
            keep[y][x] = true;
        }
        for y in 0..height {
            for x in 0..width {
                map.grid[y][x].passable = keep[y][x];
            }
        }
        map
    }

    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn is_passable(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.grid[y][x].is_passable()
    }

    /// 8-connected neighbours, matching the agents' move set.
    pub fn get_neighbors(&self, x: usize, y: usize) -> Vec<Position> {
        let mut neighbors = Vec::new();
        for dy in -1..=1_isize {
            for dx in -1..=1_isize {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (x as isize + dx, y as isize + dy);
                if self.in_bounds(nx, ny) && self.is_passable(nx as usize, ny as usize) {
                    neighbors.push((nx as usize, ny as usize));
                }
            }
        }
        neighbors
    }

    pub fn reachable(&self, from: Position, to: Position) -> bool {
        if !self.is_passable(from.0, from.1) || !self.is_passable(to.0, to.1) {
            return false;
        }
        let mut seen = vec![vec![false; self.width]; self.height];
        self.flood(from, &mut seen);
        seen[to.1][to.0]
    }

    pub fn passable_cells(&self) -> Vec<Position> {
        let mut cells = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.grid[y][x].passable {
                    cells.push((x, y));
                }
            }
        }
        cells
    }

    fn flood(&self, origin: Position, seen: &mut [Vec<bool>]) -> Vec<Position> {
        let mut region = vec![origin];
        let mut queue = VecDeque::from([origin]);
        seen[origin.1][origin.0] = true;

        while let Some((x, y)) = queue.pop_front() {
            for (nx, ny) in self.get_neighbors(x, y) {
                if !seen[ny][nx] {
                    seen[ny][nx] = true;
                    region.push((nx, ny));
                    queue.push_back((nx, ny));
                }
            }
        }
        region
    }
}

fn parse_header(line: Option<&str>, key: &str) -> anyhow::Result<usize> {
    let line = line.ok_or_else(|| anyhow!("missing {key} line"))?;
    let mut parts = line.split_whitespace();
    if parts.next() != Some(key) {
        bail!("expected `{key} N`, got `{line}`");
    }
    parts
        .next()
        .ok_or_else(|| anyhow!("missing value in `{line}`"))?
        .parse::<usize>()
        .with_context(|| format!("invalid {key} in `{line}`"))
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.grid {
            for tile in row {
                write!(f, "{}", if tile.passable { '.' } else { '@' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
