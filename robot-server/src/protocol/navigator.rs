//! 导航
//! 跟踪机器人的位置与朝向，贪心地把它带到原点，遇到障碍时绕行

use log::{debug, warn};

use crate::network::{message::MAX_OK_LEN, Command, Coordinate, Link};

use super::Error;

/// 机器人朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
}

impl Heading {
    /// 左转 90°
    pub fn left(self) -> Self {
        match self {
            Heading::Up => Heading::Left,
            Heading::Left => Heading::Down,
            Heading::Down => Heading::Right,
            Heading::Right => Heading::Up,
        }
    }

    /// 右转 90°
    pub fn right(self) -> Self {
        match self {
            Heading::Up => Heading::Right,
            Heading::Right => Heading::Down,
            Heading::Down => Heading::Left,
            Heading::Left => Heading::Up,
        }
    }

    /// 由两次观测到的位置推断朝向，x 轴优先
    pub fn from_displacement(from: Coordinate, to: Coordinate) -> Option<Self> {
        if to.x > from.x {
            Some(Heading::Right)
        } else if to.x < from.x {
            Some(Heading::Left)
        } else if to.y > from.y {
            Some(Heading::Up)
        } else if to.y < from.y {
            Some(Heading::Down)
        } else {
            None
        }
    }

    /// 转到目标朝向所需的最少转向
    fn turns_to(self, target: Heading) -> &'static [Turn] {
        if self == target {
            &[]
        } else if self.left() == target {
            &[Turn::Left]
        } else if self.right() == target {
            &[Turn::Right]
        } else {
            &[Turn::Right, Turn::Right]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

impl Turn {
    fn command(self) -> Command {
        match self {
            Turn::Left => Command::TurnLeft,
            Turn::Right => Command::TurnRight,
        }
    }

    fn apply(self, heading: Heading) -> Heading {
        match self {
            Turn::Left => heading.left(),
            Turn::Right => heading.right(),
        }
    }
}

/// 一个会话内机器人的位置估计
/// 位置只会被客户端回复的坐标更新
pub(crate) struct Navigator {
    position: Option<Coordinate>,
    previous: Option<Coordinate>,
    /// 两次定位都被阻挡时朝向未知
    heading: Option<Heading>,
    max_obstacle_retries: usize,
}

impl Navigator {
    pub(crate) fn new(max_obstacle_retries: usize) -> Self {
        Self {
            position: None,
            previous: None,
            heading: None,
            max_obstacle_retries,
        }
    }

    pub(crate) fn position(&self) -> Option<Coordinate> {
        self.position
    }

    pub(crate) fn heading(&self) -> Option<Heading> {
        self.heading
    }

    /// 上一条指令之后是否发生了位移，没有位移说明前方有障碍
    pub(crate) fn moved(&self) -> bool {
        matches!((self.previous, self.position), (Some(prev), Some(pos)) if prev != pos)
    }

    /// 无条件前进两次，由两次位置推断初始朝向
    pub(crate) async fn acquire_fix<L: Link>(&mut self, link: &mut L) -> Result<(), Error> {
        for _ in 0..2 {
            let ack = link.execute(Command::Move, MAX_OK_LEN).await?;
            self.record(&ack)?;
        }

        self.heading = match (self.previous, self.position) {
            (Some(prev), Some(pos)) => Heading::from_displacement(prev, pos),
            _ => None,
        };
        Ok(())
    }

    /// 前进一格，有位移时更新朝向
    pub(crate) async fn move_forward<L: Link>(&mut self, link: &mut L) -> Result<(), Error> {
        let ack = link.execute(Command::Move, MAX_OK_LEN).await?;
        let position = self.record(&ack)?;
        if let Some(heading) = self
            .previous
            .and_then(|prev| Heading::from_displacement(prev, position))
        {
            self.heading = Some(heading);
        }
        Ok(())
    }

    /// 原地转向，客户端仍然回复当前坐标
    pub(crate) async fn turn<L: Link>(&mut self, link: &mut L, turn: Turn) -> Result<(), Error> {
        let ack = link.execute(turn.command(), MAX_OK_LEN).await?;
        self.record(&ack)?;
        self.heading = self.heading.map(|heading| turn.apply(heading));
        Ok(())
    }

    pub(crate) async fn move_up<L: Link>(&mut self, link: &mut L) -> Result<(), Error> {
        self.step_towards(link, Heading::Up).await
    }

    pub(crate) async fn move_down<L: Link>(&mut self, link: &mut L) -> Result<(), Error> {
        self.step_towards(link, Heading::Down).await
    }

    pub(crate) async fn move_left<L: Link>(&mut self, link: &mut L) -> Result<(), Error> {
        self.step_towards(link, Heading::Left).await
    }

    pub(crate) async fn move_right<L: Link>(&mut self, link: &mut L) -> Result<(), Error> {
        self.step_towards(link, Heading::Right).await
    }

    /// 转到目标朝向后前进一格
    /// 朝向未知时直接前进，由位移确定朝向
    async fn step_towards<L: Link>(&mut self, link: &mut L, target: Heading) -> Result<(), Error> {
        if let Some(heading) = self.heading {
            for turn in heading.turns_to(target) {
                self.turn(link, *turn).await?;
            }
        }
        self.move_forward(link).await
    }

    /// 导航到原点
    /// 先消除 x 方向的距离，再消除 y 方向的距离
    /// 被阻挡时左转并前进一格，然后从新位置重新计算路径
    pub(crate) async fn navigate_to_target<L: Link>(&mut self, link: &mut L) -> Result<(), Error> {
        let mut retries = 0;
        loop {
            let position = self
                .position
                .ok_or_else(|| Error::Logic("navigation before initial fix".into()))?;
            if position == Coordinate::ORIGIN {
                debug!("target reached after {} obstacle retries", retries);
                return Ok(());
            }

            debug!("at {}, heading {:?}", position, self.heading);
            if position.x < 0 {
                self.move_right(link).await?;
            } else if position.x > 0 {
                self.move_left(link).await?;
            } else if position.y < 0 {
                self.move_up(link).await?;
            } else {
                self.move_down(link).await?;
            }

            if self.moved() {
                continue;
            }

            retries += 1;
            if retries > self.max_obstacle_retries {
                warn!("still blocked at {}, giving up", position);
                return Err(Error::NavigationStuck(self.max_obstacle_retries));
            }
            debug!("obstacle ahead of {}, going around", position);
            self.turn(link, Turn::Left).await?;
            self.move_forward(link).await?;
        }
    }

    fn record(&mut self, ack: &str) -> Result<Coordinate, Error> {
        let position = Coordinate::read_ack(ack)?;
        self.previous = self.position.replace(position);
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    use async_trait::async_trait;

    use crate::network::conn;

    use super::*;

    /// 网格上的模拟机器人，不会走进障碍格
    struct SimRobot {
        position: Coordinate,
        heading: Heading,
        obstacles: HashSet<Coordinate>,
        commands: Vec<Command>,
    }

    impl SimRobot {
        fn new(x: i32, y: i32, heading: Heading) -> Self {
            Self {
                position: Coordinate::new(x, y),
                heading,
                obstacles: HashSet::new(),
                commands: Vec::new(),
            }
        }

        fn with_obstacles(mut self, obstacles: &[(i32, i32)]) -> Self {
            self.obstacles = obstacles
                .iter()
                .map(|(x, y)| Coordinate::new(*x, *y))
                .collect();
            self
        }

        fn ahead(&self) -> Coordinate {
            let Coordinate { x, y } = self.position;
            match self.heading {
                Heading::Up => Coordinate::new(x, y + 1),
                Heading::Down => Coordinate::new(x, y - 1),
                Heading::Left => Coordinate::new(x - 1, y),
                Heading::Right => Coordinate::new(x + 1, y),
            }
        }

        fn moves(&self) -> usize {
            self.commands.iter().filter(|c| **c == Command::Move).count()
        }
    }

    #[async_trait]
    impl Link for SimRobot {
        async fn read_message(&mut self, _max_len: usize) -> Result<String, conn::Error> {
            Ok(format!("OK {} {}", self.position.x, self.position.y))
        }

        async fn send(&mut self, command: Command) -> Result<(), conn::Error> {
            self.commands.push(command);
            match command {
                Command::Move => {
                    let next = self.ahead();
                    if !self.obstacles.contains(&next) {
                        self.position = next;
                    }
                }
                Command::TurnLeft => self.heading = self.heading.left(),
                Command::TurnRight => self.heading = self.heading.right(),
                _ => {}
            }
            Ok(())
        }
    }

    /// 按顺序回复预设报文
    struct Script(VecDeque<&'static str>);

    #[async_trait]
    impl Link for Script {
        async fn read_message(&mut self, _max_len: usize) -> Result<String, conn::Error> {
            self.0
                .pop_front()
                .map(String::from)
                .ok_or(conn::Error::ConnectionAborted)
        }

        async fn send(&mut self, _command: Command) -> Result<(), conn::Error> {
            Ok(())
        }
    }

    #[test]
    fn heading_turns_cycle() {
        let mut heading = Heading::Up;
        let mut seen = Vec::new();
        for _ in 0..4 {
            heading = heading.left();
            seen.push(heading);
        }
        assert_eq!(
            seen,
            vec![Heading::Left, Heading::Down, Heading::Right, Heading::Up]
        );

        for heading in [Heading::Up, Heading::Down, Heading::Left, Heading::Right] {
            assert_eq!(heading.left().right(), heading);
        }
    }

    #[test]
    fn minimal_turns() {
        assert!(Heading::Up.turns_to(Heading::Up).is_empty());
        assert_eq!(Heading::Up.turns_to(Heading::Left), &[Turn::Left]);
        assert_eq!(Heading::Up.turns_to(Heading::Right), &[Turn::Right]);
        assert_eq!(Heading::Left.turns_to(Heading::Right).len(), 2);
        assert_eq!(Heading::Down.turns_to(Heading::Up).len(), 2);
    }

    #[test]
    fn heading_from_displacement() {
        let from = Coordinate::new(1, 1);
        let cases = [
            ((2, 1), Some(Heading::Right)),
            ((0, 1), Some(Heading::Left)),
            ((1, 2), Some(Heading::Up)),
            ((1, 0), Some(Heading::Down)),
            ((1, 1), None),
        ];
        for ((x, y), heading) in cases {
            assert_eq!(
                Heading::from_displacement(from, Coordinate::new(x, y)),
                heading
            );
        }
    }

    #[tokio::test]
    async fn initial_fix_derives_heading() {
        let mut link = Script(VecDeque::from(["OK 1 1", "OK 2 1"]));
        let mut navigator = Navigator::new(8);

        navigator.acquire_fix(&mut link).await.unwrap();
        assert_eq!(navigator.position(), Some(Coordinate::new(2, 1)));
        assert_eq!(navigator.heading(), Some(Heading::Right));
        assert!(navigator.moved());
    }

    #[tokio::test]
    async fn blocked_initial_fix_leaves_heading_unset() {
        let mut link = Script(VecDeque::from(["OK 3 0", "OK 3 0"]));
        let mut navigator = Navigator::new(8);

        navigator.acquire_fix(&mut link).await.unwrap();
        assert_eq!(navigator.heading(), None);
        assert!(!navigator.moved());
    }

    #[tokio::test]
    async fn malformed_ack_is_syntax_error() {
        let mut link = Script(VecDeque::from(["OK 1 1", "OK x 1"]));
        let mut navigator = Navigator::new(8);

        let err = navigator.acquire_fix(&mut link).await.unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));

        let mut link = Script(VecDeque::from(["OK 1 1 1"]));
        let err = navigator.acquire_fix(&mut link).await.unwrap_err();
        assert!(matches!(err, Error::Syntax(_)));
    }

    #[tokio::test]
    async fn turn_keeps_position() {
        let mut robot = SimRobot::new(0, 1, Heading::Right);
        let mut navigator = Navigator::new(8);
        navigator.acquire_fix(&mut robot).await.unwrap();

        navigator.turn(&mut robot, Turn::Left).await.unwrap();
        assert_eq!(navigator.position(), Some(Coordinate::new(2, 1)));
        assert!(!navigator.moved());
        assert_eq!(navigator.heading(), Some(Heading::Up));
    }

    #[tokio::test]
    async fn directional_moves_align_heading() {
        let mut robot = SimRobot::new(0, 0, Heading::Up);
        let mut navigator = Navigator::new(8);
        navigator.acquire_fix(&mut robot).await.unwrap();
        robot.commands.clear();

        navigator.move_down(&mut robot).await.unwrap();
        assert_eq!(
            robot.commands,
            vec![Command::TurnRight, Command::TurnRight, Command::Move]
        );
        assert_eq!(navigator.heading(), Some(Heading::Down));
        assert_eq!(navigator.position(), Some(Coordinate::new(0, 1)));

        robot.commands.clear();
        navigator.move_right(&mut robot).await.unwrap();
        assert_eq!(robot.commands, vec![Command::TurnLeft, Command::Move]);
        assert_eq!(navigator.heading(), Some(Heading::Right));
        assert_eq!(navigator.position(), Some(Coordinate::new(1, 1)));
    }

    #[tokio::test]
    async fn converges_without_obstacles() {
        let headings = [Heading::Up, Heading::Down, Heading::Left, Heading::Right];
        for x in -4..=4 {
            for y in -4..=4 {
                for heading in headings {
                    let mut robot = SimRobot::new(x, y, heading);
                    let mut navigator = Navigator::new(8);
                    navigator.acquire_fix(&mut robot).await.unwrap();
                    let start = robot.position;
                    robot.commands.clear();

                    navigator.navigate_to_target(&mut robot).await.unwrap();

                    assert_eq!(robot.position, Coordinate::ORIGIN);
                    assert_eq!(navigator.position(), Some(Coordinate::ORIGIN));
                    assert_eq!(
                        robot.moves(),
                        (start.x.abs() + start.y.abs()) as usize,
                        "from {} heading {:?}",
                        start,
                        heading
                    );
                    if robot.moves() > 0 {
                        assert_eq!(navigator.heading(), Some(robot.heading));
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn obstacle_recovery_turns_left_and_moves() {
        let mut robot = SimRobot::new(5, 0, Heading::Left).with_obstacles(&[(1, 0)]);
        let mut navigator = Navigator::new(8);
        navigator.acquire_fix(&mut robot).await.unwrap();
        assert_eq!(navigator.position(), Some(Coordinate::new(3, 0)));
        assert_eq!(navigator.heading(), Some(Heading::Left));
        robot.commands.clear();

        navigator.navigate_to_target(&mut robot).await.unwrap();

        assert_eq!(
            robot.commands,
            vec![
                Command::Move,
                // 被 (1, 0) 阻挡
                Command::Move,
                Command::TurnLeft,
                Command::Move,
                Command::TurnRight,
                Command::Move,
                Command::Move,
                Command::TurnRight,
                Command::Move,
            ]
        );
        assert_eq!(navigator.position(), Some(Coordinate::ORIGIN));
        assert_eq!(navigator.heading(), Some(Heading::Up));
    }

    #[tokio::test]
    async fn unknown_heading_is_resolved_by_moving() {
        let mut robot = SimRobot::new(3, 0, Heading::Left).with_obstacles(&[(2, 0)]);
        let mut navigator = Navigator::new(8);
        navigator.acquire_fix(&mut robot).await.unwrap();
        assert_eq!(navigator.heading(), None);

        navigator.navigate_to_target(&mut robot).await.unwrap();
        assert_eq!(robot.position, Coordinate::ORIGIN);
        assert_eq!(navigator.heading(), Some(robot.heading));
    }

    #[tokio::test]
    async fn walled_in_robot_gets_stuck() {
        let mut robot = SimRobot::new(3, 3, Heading::Up)
            .with_obstacles(&[(3, 4), (3, 2), (2, 3), (4, 3)]);
        let mut navigator = Navigator::new(5);
        navigator.acquire_fix(&mut robot).await.unwrap();

        let err = navigator.navigate_to_target(&mut robot).await.unwrap_err();
        assert!(matches!(err, Error::NavigationStuck(5)));
        assert_eq!(robot.position, Coordinate::new(3, 3));
    }

    #[tokio::test]
    async fn navigation_requires_initial_fix() {
        let mut link = Script(VecDeque::new());
        let mut navigator = Navigator::new(8);

        let err = navigator.navigate_to_target(&mut link).await.unwrap_err();
        assert!(matches!(err, Error::Logic(_)));
    }
}
