use ndarray::{s, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use super::{Environment, StepInfo, StepOutcome};
use crate::error::{DuelnetError, Result};
use crate::types::{Action, RgbFrame};

const BALL_COLOR: [u8; 3] = [236, 236, 236];
const PADDLE_COLOR: [u8; 3] = [200, 72, 72];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatchConfig {
    pub rows: usize,
    pub columns: usize,
    /// Screen pixels per grid cell
    pub cell_size: usize,
    pub paddle_width: usize,
    pub lives: u32,
}

impl Default for CatchConfig {
    /// A 210x160 screen, the size of an Atari frame.
    fn default() -> Self {
        CatchConfig {
            rows: 21,
            columns: 16,
            cell_size: 10,
            paddle_width: 3,
            lives: 5,
        }
    }
}

impl CatchConfig {
    pub fn screen_size(&self) -> (usize, usize) {
        (self.rows * self.cell_size, self.columns * self.cell_size)
    }
}

/// Catch the falling ball with a paddle on the bottom row.
///
/// Actions: 0 stays, 1 moves left, 2 moves right. A catch scores 1, a miss
/// costs a life; the episode ends when no lives are left.
#[derive(Debug, Clone)]
pub struct ScreenCatch {
    config: CatchConfig,
    rng: StdRng,
    ball: (usize, usize),
    paddle: usize,
    lives: u32,
    done: bool,
}

impl ScreenCatch {
    pub const NUM_ACTIONS: usize = 3;

    pub fn new(config: CatchConfig, seed: u64) -> Result<Self> {
        if config.rows < 2 || config.columns == 0 || config.cell_size == 0 {
            return Err(DuelnetError::invalid_parameter("config", "screen needs at least 2 rows, 1 column and 1 pixel per cell"));
        }
        if config.paddle_width == 0 || config.paddle_width > config.columns {
            return Err(DuelnetError::invalid_parameter("paddle_width", "paddle must fit on the screen"));
        }
        if config.lives == 0 {
            return Err(DuelnetError::invalid_parameter("lives", "game needs at least one life"));
        }

        let lives = config.lives;
        let mut game = ScreenCatch {
            config,
            rng: StdRng::seed_from_u64(seed),
            ball: (0, 0),
            paddle: 0,
            lives,
            done: true,
        };
        game.center_paddle();
        Ok(game)
    }

    pub fn config(&self) -> &CatchConfig {
        &self.config
    }

    /// `(row, column)` of the ball
    pub fn ball(&self) -> (usize, usize) {
        self.ball
    }

    /// Leftmost column of the paddle
    pub fn paddle(&self) -> usize {
        self.paddle
    }

    fn center_paddle(&mut self) {
        self.paddle = (self.config.columns - self.config.paddle_width) / 2;
    }

    fn drop_ball(&mut self) {
        self.ball = (0, self.rng.gen_range(0..self.config.columns));
    }

    fn paint_cell(&self, screen: &mut RgbFrame, row: usize, column: usize, color: [u8; 3]) {
        let size = self.config.cell_size;
        let mut cell = screen.slice_mut(s![row * size..(row + 1) * size, column * size..(column + 1) * size, ..]);
        for mut pixel in cell.lanes_mut(ndarray::Axis(2)) {
            pixel.assign(&ndarray::arr1(&color));
        }
    }
}

impl Environment for ScreenCatch {
    fn reset(&mut self) -> Result<RgbFrame> {
        self.lives = self.config.lives;
        self.done = false;
        self.center_paddle();
        self.drop_ball();
        self.render()
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome> {
        if self.done {
            return Err(DuelnetError::Environment("step called on a finished episode; call reset first".to_string()));
        }
        let max_left = self.config.columns - self.config.paddle_width;
        match action {
            0 => {}
            1 => self.paddle = self.paddle.saturating_sub(1),
            2 => self.paddle = (self.paddle + 1).min(max_left),
            _ => {
                return Err(DuelnetError::InvalidAction { action, max_actions: Self::NUM_ACTIONS });
            }
        }

        self.ball.0 += 1;
        let mut reward = 0.0;
        if self.ball.0 == self.config.rows - 1 {
            let caught = (self.paddle..self.paddle + self.config.paddle_width).contains(&self.ball.1);
            if caught {
                reward = 1.0;
            } else {
                self.lives -= 1;
            }
            self.drop_ball();
        }
        self.done = self.lives == 0;

        Ok(StepOutcome {
            observation: self.render()?,
            reward,
            done: self.done,
            info: StepInfo { lives: self.lives },
        })
    }

    fn action_space_size(&self) -> usize {
        Self::NUM_ACTIONS
    }

    fn lives(&self) -> u32 {
        self.lives
    }

    fn render(&self) -> Result<RgbFrame> {
        let (height, width) = self.config.screen_size();
        let mut screen = Array3::zeros((height, width, 3));
        self.paint_cell(&mut screen, self.ball.0, self.ball.1, BALL_COLOR);
        for column in self.paddle..self.paddle + self.config.paddle_width {
            self.paint_cell(&mut screen, self.config.rows - 1, column, PADDLE_COLOR);
        }
        Ok(screen)
    }
}
