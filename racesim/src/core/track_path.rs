use helpers::general::lin_interp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of straight segments a cubic Bézier curve is flattened into.
const CURVE_SEGMENTS: usize = 16;
/// (viewBox units) Maximum distance between the first and the last point of a closed path.
const CLOSE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackPathError {
    #[error("unexpected character {0:?} at byte {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("unsupported path command {0:?}")]
    UnsupportedCommand(char),
    #[error("path command {0:?} is missing coordinates")]
    MissingCoordinates(char),
    #[error("path data must start with a move command")]
    MissingMoveTo,
    #[error("path has zero length")]
    ZeroLength,
    #[error("path is not closed, it ends {0:.3} units away from its start")]
    NotClosed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    fn dist(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Cmd(char),
    Num(f64),
}

/// TrackPath is the closed track centerline, parsed from SVG-style path data (viewBox 0 0 100 100)
/// and parameterised by arc length. Progress values (0 - 100, percent of a lap) map linearly onto
/// the arc length.
#[derive(Debug, Clone)]
pub struct TrackPath {
    points: Vec<Point>,
    s: Vec<f64>,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl TrackPath {
    /// parse supports the commands M, L, H, V, C and Z in absolute and relative form.
    pub fn parse(data: &str) -> Result<TrackPath, TrackPathError> {
        let tokens = tokenize(data)?;
        let mut points: Vec<Point> = Vec::new();
        let mut cur = Point::default();
        let mut subpath_start = Point::default();
        let mut idx = 0;

        while idx < tokens.len() {
            let cmd = match tokens[idx] {
                Token::Cmd(c) => c,
                Token::Num(_) => return Err(TrackPathError::MissingMoveTo),
            };
            idx += 1;

            if points.is_empty() && !matches!(cmd, 'M' | 'm') {
                return Err(TrackPathError::MissingMoveTo);
            }

            let relative = cmd.is_ascii_lowercase();
            let origin = |cur: Point| if relative { cur } else { Point::default() };

            match cmd.to_ascii_uppercase() {
                'Z' => {
                    points.push(subpath_start);
                    cur = subpath_start;
                }
                'M' | 'L' => {
                    let mut first = true;
                    loop {
                        let args = take_numbers(&tokens, &mut idx, 2, cmd, first)?;
                        let Some(args) = args else { break };
                        let o = origin(cur);
                        cur = Point { x: o.x + args[0], y: o.y + args[1] };
                        if first && cmd.to_ascii_uppercase() == 'M' {
                            subpath_start = cur;
                        }
                        points.push(cur);
                        first = false;
                    }
                }
                'H' | 'V' => {
                    let mut first = true;
                    loop {
                        let args = take_numbers(&tokens, &mut idx, 1, cmd, first)?;
                        let Some(args) = args else { break };
                        let o = origin(cur);
                        if cmd.to_ascii_uppercase() == 'H' {
                            cur.x = o.x + args[0];
                        } else {
                            cur.y = o.y + args[0];
                        }
                        points.push(cur);
                        first = false;
                    }
                }
                'C' => {
                    let mut first = true;
                    loop {
                        let args = take_numbers(&tokens, &mut idx, 6, cmd, first)?;
                        let Some(args) = args else { break };
                        let o = origin(cur);
                        let p1 = Point { x: o.x + args[0], y: o.y + args[1] };
                        let p2 = Point { x: o.x + args[2], y: o.y + args[3] };
                        let p3 = Point { x: o.x + args[4], y: o.y + args[5] };
                        flatten_cubic(cur, p1, p2, p3, &mut points);
                        cur = p3;
                        first = false;
                    }
                }
                other => return Err(TrackPathError::UnsupportedCommand(other)),
            }
        }

        TrackPath::from_points(points)
    }

    /// from_points builds a path from an ordered list of centerline points. The last point must
    /// coincide with the first one, since cars lap the path.
    pub fn from_points(points: Vec<Point>) -> Result<TrackPath, TrackPathError> {
        if points.is_empty() {
            return Err(TrackPathError::MissingMoveTo);
        }

        let mut s = Vec::with_capacity(points.len());
        s.push(0.0);
        for i in 1..points.len() {
            s.push(s[i - 1] + points[i - 1].dist(&points[i]));
        }

        if s[s.len() - 1] <= 0.0 {
            return Err(TrackPathError::ZeroLength);
        }

        let gap = points[0].dist(&points[points.len() - 1]);
        if gap > CLOSE_EPS {
            return Err(TrackPathError::NotClosed(gap));
        }

        let xs = points.iter().map(|p| p.x).collect();
        let ys = points.iter().map(|p| p.y).collect();

        Ok(TrackPath { points, s, xs, ys })
    }

    /// length returns the arc length of the path in viewBox units.
    pub fn length(&self) -> f64 {
        self.s[self.s.len() - 1]
    }

    /// point_at returns the 2D position for a progress value in [0, 100). Values outside of that
    /// range are clamped.
    pub fn point_at(&self, progress: f64) -> Point {
        let s_target = (progress / 100.0).clamp(0.0, 1.0) * self.length();
        let first = self.points[0];

        Point {
            x: lin_interp(s_target, &self.s, &self.xs).unwrap_or(first.x),
            y: lin_interp(s_target, &self.s, &self.ys).unwrap_or(first.y),
        }
    }

    /// sample returns `no_steps + 1` equidistant points along the path, e.g. for drawing it.
    pub fn sample(&self, no_steps: usize) -> Vec<Point> {
        let no_steps = no_steps.max(1);
        (0..=no_steps)
            .map(|i| self.point_at(i as f64 / no_steps as f64 * 100.0))
            .collect()
    }
}

fn flatten_cubic(p0: Point, p1: Point, p2: Point, p3: Point, points: &mut Vec<Point>) {
    for i in 1..=CURVE_SEGMENTS {
        let t = i as f64 / CURVE_SEGMENTS as f64;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        points.push(Point {
            x: a * p0.x + b * p1.x + c * p2.x + d * p3.x,
            y: a * p0.y + b * p1.y + c * p2.y + d * p3.y,
        });
    }
}

/// take_numbers reads the next `n` numeric arguments of a command. The first argument group is
/// mandatory, further groups are implicit repetitions of the command.
fn take_numbers(
    tokens: &[Token],
    idx: &mut usize,
    n: usize,
    cmd: char,
    mandatory: bool,
) -> Result<Option<Vec<f64>>, TrackPathError> {
    if !matches!(tokens.get(*idx), Some(Token::Num(_))) {
        return if mandatory {
            Err(TrackPathError::MissingCoordinates(cmd))
        } else {
            Ok(None)
        };
    }

    let mut args = Vec::with_capacity(n);
    for _ in 0..n {
        match tokens.get(*idx) {
            Some(Token::Num(v)) => {
                args.push(*v);
                *idx += 1;
            }
            _ => return Err(TrackPathError::MissingCoordinates(cmd)),
        }
    }
    Ok(Some(args))
}

fn tokenize(data: &str) -> Result<Vec<Token>, TrackPathError> {
    let bytes = data.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c.is_ascii_whitespace() || c == ',' {
            i += 1;
        } else if c.is_ascii_alphabetic() && c != 'e' && c != 'E' {
            tokens.push(Token::Cmd(c));
            i += 1;
        } else if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' {
            let start = i;
            if c == '-' || c == '+' {
                i += 1;
            }
            let mut seen_dot = false;
            while i < bytes.len() {
                let d = bytes[i] as char;
                if d.is_ascii_digit() {
                    i += 1;
                } else if d == '.' && !seen_dot {
                    seen_dot = true;
                    i += 1;
                } else if (d == 'e' || d == 'E') && i > start {
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
                        i += 1;
                    }
                } else {
                    break;
                }
            }
            let text = &data[start..i];
            let value = text
                .parse::<f64>()
                .map_err(|_| TrackPathError::InvalidNumber(text.to_owned()))?;
            tokens.push(Token::Num(value));
        } else {
            return Err(TrackPathError::UnexpectedChar(c, i));
        }
    }

    Ok(tokens)
}
